//! # plugbridge Utilities
//!
//! Shared logging setup for the plugbridge workspace.
//!
//! Code running inside the debugger cannot rely on stdout, so besides the
//! usual console/file setup this crate can route `tracing` output into any
//! line-oriented sink, typically the host's log window.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_to_sink, init_logging_with_level, sink_subscriber, LineSink, LogFormat, LogLevel,
    LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};

//! # Logging Utilities
//!
//! Logging infrastructure for plugbridge using `tracing`.
//!
//! Two destinations are supported:
//! - **Console / file** for tools and tests (`init_logging`,
//!   `init_logging_with_level`)
//! - **A line sink** for code running inside the debugger, where stdout goes
//!   nowhere and log lines should end up in the host's log window
//!   (`init_logging_to_sink`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plugbridge_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Inside the host
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plugbridge_utils::{init_logging_to_sink, LogLevel};
//!
//! // Forward each formatted line to the host's raw print export
//! init_logging_to_sink(LogLevel::Debug, Arc::new(|line: &str| {
//!     let _ = line; // bridge.log_puts(line)
//! }))
//! .expect("Failed to initialize logging");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=plugbridge_core=trace`)
//! - `PLUGBRIDGE_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `PLUGBRIDGE_LOG_FILE`: Optional path to a daily-rolled log file

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::{env, fmt as std_fmt, fs};

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "PLUGBRIDGE_LOG_FORMAT";

/// Environment variable naming an optional log file.
pub const LOG_FILE_ENV: &str = "PLUGBRIDGE_LOG_FILE";

/// Keeps the non-blocking file writer alive for the rest of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Receives one formatted log line (without trailing newline) per event.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `plugbridge_core=debug`)
/// - `PLUGBRIDGE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `PLUGBRIDGE_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `PLUGBRIDGE_LOG_FORMAT` holds an unknown format
/// - `PLUGBRIDGE_LOG_FILE` names a file whose directory does not exist
pub fn init_logging() -> Result<(), LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::Pretty,
    };

    // A module-specific RUST_LOG is not a plain level; EnvFilter handles it below
    let default_level = env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<LogLevel>().ok())
        .map_or(Level::INFO, Into::into);

    init_console(format, default_level)
}

/// Initialize logging with explicit level and format
///
/// ## Example
///
/// ```rust,no_run
/// use plugbridge_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the
/// `PLUGBRIDGE_LOG_FILE` directory does not exist.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_console(format, level.into())
}

/// Initialize logging into a [`LineSink`]
///
/// Every event is formatted without ANSI colours or timestamps (the host's
/// log window adds its own) and handed to `sink` as one line.
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_to_sink(level: LogLevel, sink: LineSink) -> Result<(), LoggingError>
{
    sink_subscriber(level, sink)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Build the subscriber used by [`init_logging_to_sink`] without installing it.
///
/// Useful with `tracing::subscriber::with_default` for scoped capture.
pub fn sink_subscriber(level: LogLevel, sink: LineSink) -> impl Subscriber + Send + Sync
{
    let layer = fmt::layer()
        .with_writer(SinkWriter::new(sink))
        .with_ansi(false)
        .with_target(true)
        .without_time()
        .with_filter(EnvFilter::new(Level::from(level).to_string()));
    Registry::default().with(layer)
}

fn init_console(format: LogFormat, default_level: Level) -> Result<(), LoggingError>
{
    // RUST_LOG can override the default level with more specific filters
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let file_writer = env::var(LOG_FILE_ENV)
        .ok()
        .map(PathBuf::from)
        .map(|path| file_writer(&path))
        .transpose()?;

    let result = match format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(env_filter.clone());

            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false) // No ANSI in files
                    .with_filter(env_filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr)
                .with_filter(env_filter.clone());

            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(env_filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
    };

    result.map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Daily-rolled writer for `path`.
///
/// The appender itself never fails; a missing log directory would only show
/// up as silently dropped lines, so it is checked here.
fn file_writer(path: &Path) -> Result<tracing_appender::non_blocking::NonBlocking, LoggingError>
{
    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    if !fs::metadata(directory)?.is_dir() {
        return Err(LoggingError::FileError(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", directory.display()),
        )));
    }
    let file_appender = tracing_appender::rolling::daily(directory, path.file_name().unwrap_or_default());
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Only the first guard is kept; logging can be initialized once anyway
    let _ = FILE_GUARD.set(guard);
    Ok(non_blocking)
}

/// [`MakeWriter`] producing one [`LineWriter`] per event.
#[derive(Clone)]
pub struct SinkWriter
{
    sink: LineSink,
}

impl SinkWriter
{
    /// Wrap `sink`.
    #[must_use]
    pub fn new(sink: LineSink) -> Self
    {
        Self { sink }
    }
}

impl std_fmt::Debug for SinkWriter
{
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result
    {
        f.debug_struct("SinkWriter").finish_non_exhaustive()
    }
}

impl<'a> MakeWriter<'a> for SinkWriter
{
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer
    {
        LineWriter {
            sink: Arc::clone(&self.sink),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one formatted event and hands it to the sink when dropped.
pub struct LineWriter
{
    sink: LineSink,
    buffer: Vec<u8>,
}

impl Write for LineWriter
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

impl Drop for LineWriter
{
    fn drop(&mut self)
    {
        if self.buffer.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buffer);
        (self.sink)(text.trim_end_matches(['\r', '\n']));
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use std::sync::Mutex;

    use super::*;

    fn capture() -> (Arc<Mutex<Vec<String>>>, LineSink)
    {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let sink: LineSink = Arc::new(move |line: &str| sink_lines.lock().unwrap().push(line.to_string()));
        (lines, sink)
    }

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(s)) if s == "xml"));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_sink_receives_one_line_per_event()
    {
        let (lines, sink) = capture();
        tracing::subscriber::with_default(sink_subscriber(LogLevel::Info, sink), || {
            tracing::info!(slot = 3, "registered command");
            tracing::debug!("filtered out");
            tracing::warn!("host rejected");
        });

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("registered command"));
        assert!(lines[0].contains("slot=3"));
        assert!(lines[1].contains("host rejected"));
        assert!(lines.iter().all(|line| !line.ends_with('\n')));
    }

    #[test]
    fn test_file_writer_requires_log_directory()
    {
        let missing = Path::new("/nonexistent-plugbridge-logs/bridge.log");
        assert!(matches!(file_writer(missing), Err(LoggingError::FileError(_))));

        let under_file = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml").join("bridge.log");
        match file_writer(&under_file) {
            Err(LoggingError::FileError(err)) => assert_eq!(err.kind(), io::ErrorKind::InvalidInput),
            Err(other) => panic!("expected a file error, got {other}"),
            Ok(_) => panic!("expected a file error"),
        }
    }

    #[test]
    fn test_line_writer_ignores_empty_events()
    {
        let (lines, sink) = capture();
        drop(SinkWriter::new(sink).make_writer());
        assert!(lines.lock().unwrap().is_empty());
    }
}

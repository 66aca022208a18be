//! # Fault Containment
//!
//! Every function the host calls into runs under [`contain`]. The host is
//! native code: a Rust panic unwinding into its frames is undefined
//! behaviour, and an error value it does not understand is useless to it.
//! So at the edge both become the call shape's safe default (`false`, `0`,
//! `()`) plus exactly one report to a [`FaultSink`].
//!
//! ## Example
//!
//! ```rust
//! use plugbridge_core::error::BridgeError;
//! use plugbridge_core::guard::{contain, TracingFaultSink};
//!
//! let ok: bool = contain("example", &TracingFaultSink, || Ok(true));
//! assert!(ok);
//!
//! let failed: usize = contain("example", &TracingFaultSink, || Err(BridgeError::NullName));
//! assert_eq!(failed, 0);
//!
//! let panicked: bool = contain("example", &TracingFaultSink, || panic!("boom"));
//! assert!(!panicked);
//! ```

use std::any::Any;
use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;

/// A failure that was stopped at the native boundary.
#[derive(Debug, Error)]
pub enum Fault
{
    /// The dispatch returned an error.
    #[error("{site}: {source}")]
    Failed
    {
        /// Boundary function that contained the fault
        site: &'static str,
        /// Error returned by the dispatch
        #[source]
        source: BridgeError,
    },

    /// The dispatch panicked.
    #[error("{site}: panicked: {message}")]
    Panicked
    {
        /// Boundary function that contained the fault
        site: &'static str,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl Fault
{
    /// Boundary function that contained the fault.
    #[must_use]
    pub fn site(&self) -> &'static str
    {
        match self {
            Self::Failed { site, .. } | Self::Panicked { site, .. } => site,
        }
    }
}

/// Side channel that receives contained faults.
pub trait FaultSink: Send + Sync
{
    /// Record one contained fault.
    fn report(&self, fault: &Fault);
}

/// Reports faults through `tracing` only.
///
/// Used by trampolines before a bridge is installed, when no host log is
/// reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink
{
    fn report(&self, fault: &Fault)
    {
        error!(site = fault.site(), "unhandled fault contained at native boundary: {fault}");
    }
}

/// Reports faults to the host's log window and through `tracing`.
#[derive(Clone)]
pub struct HostFaultSink
{
    host: Arc<dyn Host>,
}

impl HostFaultSink
{
    /// Create a sink writing to `host`'s raw log export.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self
    {
        Self { host }
    }
}

impl FaultSink for HostFaultSink
{
    fn report(&self, fault: &Fault)
    {
        TracingFaultSink.report(fault);
        let line = format!("[plugbridge] Unhandled fault: {fault}\n").replace('\0', "\u{fffd}");
        if let Ok(text) = CString::new(line) {
            self.host.log_puts(&text);
        }
    }
}

/// Run `op`, converting any error or panic into `T::default()`.
///
/// `site` names the boundary function in the report. The sink is called at
/// most once per invocation; a panic inside the sink itself is swallowed.
pub fn contain<T, F>(site: &'static str, sink: &dyn FaultSink, op: F) -> T
where
    T: Default,
    F: FnOnce() -> BridgeResult<T>,
{
    let fault = match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => return value,
        Ok(Err(source)) => Fault::Failed { site, source },
        Err(payload) => Fault::Panicked {
            site,
            message: panic_message(payload.as_ref()),
        },
    };

    let _ = panic::catch_unwind(AssertUnwindSafe(|| sink.report(&fault)));
    T::default()
}

fn panic_message(payload: &(dyn Any + Send)) -> String
{
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests
{
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl FaultSink for Collect
    {
        fn report(&self, fault: &Fault)
        {
            self.0.lock().unwrap().push(fault.to_string());
        }
    }

    struct Exploding;

    impl FaultSink for Exploding
    {
        fn report(&self, _fault: &Fault)
        {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_success_is_not_reported()
    {
        let sink = Collect::default();
        assert_eq!(contain("ok", &sink, || Ok(7usize)), 7);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_becomes_default()
    {
        let sink = Collect::default();
        let result: bool = contain("cmd", &sink, || Err(BridgeError::NullPayload("argv")));
        assert!(!result);

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("cmd"));
        assert!(reports[0].contains("argv"));
    }

    #[test]
    fn test_panic_becomes_default()
    {
        let sink = Collect::default();
        let result: usize = contain("expr", &sink, || -> BridgeResult<usize> { panic!("index {} out of range", 3) });
        assert_eq!(result, 0);
        assert_eq!(sink.0.lock().unwrap().as_slice(), ["expr: panicked: index 3 out of range"]);
    }

    #[test]
    fn test_panicking_sink_is_contained()
    {
        let result: bool = contain("cb", &Exploding, || Err(BridgeError::NullName));
        assert!(!result);
    }
}

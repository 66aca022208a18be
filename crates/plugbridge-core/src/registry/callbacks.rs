//! Event callback registry: one slot per callback type.

use std::fmt;
use std::sync::{Arc, Mutex};

use libc::{c_int, c_void};
use tracing::{debug, warn};

use super::lock;
use crate::error::{BridgeError, BridgeResult, CallbackResult};
use crate::host::{CallbackFn, Host};
use crate::payload::CallbackInfo;
use crate::types::{CallbackType, PluginHandle};

/// Closure stored for an event callback.
pub type CallbackThunk = dyn Fn(&CallbackInfo<'_>) -> CallbackResult<()> + Send + Sync;

struct CallbackSlot
{
    owner: PluginHandle,
    thunk: Arc<CallbackThunk>,
}

/// Fixed table of [`CallbackType::COUNT`] event slots.
///
/// Re-registering a type silently replaces the previous closure; there is no
/// reference counting. The host is always handed the same trampoline, which
/// looks the slot up by the event code it is called with.
pub struct CallbackRegistry
{
    host: Arc<dyn Host>,
    native: CallbackFn,
    slots: Mutex<[Option<CallbackSlot>; CallbackType::COUNT]>,
}

impl CallbackRegistry
{
    /// Create an empty registry handing `native` to the host on registration.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, native: CallbackFn) -> Self
    {
        Self {
            host,
            native,
            slots: Mutex::new(std::array::from_fn(|_| None)),
        }
    }

    /// Register `callback` for `cb_type`.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// bridge.callbacks().register(handle, CallbackType::LoadDll, |info| {
    ///     let load = info.load_dll()?;
    ///     tracing::info!(module = ?load.module_name, "loaded");
    ///     Ok(())
    /// })?;
    /// ```
    pub fn register<F>(&self, owner: PluginHandle, cb_type: CallbackType, callback: F) -> BridgeResult<()>
    where
        F: Fn(&CallbackInfo<'_>) -> CallbackResult<()> + Send + Sync + 'static,
    {
        self.register_dyn(owner, cb_type.raw(), Some(Arc::new(callback)))
    }

    /// Core registration path taking the raw event code.
    ///
    /// ## Errors
    ///
    /// - `InvalidEventType` if `cb_type` is outside `[0, CB_LAST)`
    /// - `NullCallback` if `callback` is `None`
    ///
    /// Both are checked before the host is called.
    pub fn register_dyn(
        &self,
        owner: PluginHandle,
        cb_type: c_int,
        callback: Option<Arc<CallbackThunk>>,
    ) -> BridgeResult<()>
    {
        let kind = CallbackType::from_raw(cb_type)?;
        let thunk = callback.ok_or(BridgeError::NullCallback)?;

        let mut slots = lock(&self.slots);
        let previous = slots[kind.index()].replace(CallbackSlot { owner, thunk });
        if let Some(previous) = previous {
            debug!(
                plugin = %owner,
                previous_owner = %previous.owner,
                cb_type = kind.c_name(),
                "overwriting registered callback"
            );
        }
        self.host.register_callback(owner, kind, self.native);
        debug!(plugin = %owner, cb_type = kind.c_name(), "registered callback");
        Ok(())
    }

    /// Unregister the callback for `cb_type`.
    ///
    /// The slot is cleared only if the host confirms; a rejected request
    /// leaves the registration intact. Returns the host's verdict.
    pub fn unregister(&self, owner: PluginHandle, cb_type: CallbackType) -> bool
    {
        let mut slots = lock(&self.slots);
        if !self.host.unregister_callback(owner, cb_type) {
            warn!(plugin = %owner, cb_type = cb_type.c_name(), "host rejected callback unregistration");
            return false;
        }
        slots[cb_type.index()] = None;
        debug!(plugin = %owner, cb_type = cb_type.c_name(), "unregistered callback");
        true
    }

    /// Whether a closure is stored for `cb_type`.
    #[must_use]
    pub fn is_registered(&self, cb_type: CallbackType) -> bool
    {
        lock(&self.slots)[cb_type.index()].is_some()
    }

    /// Callback types that currently have a closure.
    #[must_use]
    pub fn registered(&self) -> Vec<CallbackType>
    {
        let slots = lock(&self.slots);
        CallbackType::ALL.iter().copied().filter(|kind| slots[kind.index()].is_some()).collect()
    }

    /// Run the closure registered for `info.kind()`.
    ///
    /// Returns `Ok(false)` if the slot is empty. The table lock is released
    /// before the closure runs.
    pub fn dispatch(&self, info: &CallbackInfo<'_>) -> BridgeResult<bool>
    {
        let thunk = lock(&self.slots)[info.kind().index()]
            .as_ref()
            .map(|slot| Arc::clone(&slot.thunk));
        let Some(thunk) = thunk else {
            return Ok(false);
        };
        thunk(info).map_err(BridgeError::Callback)?;
        Ok(true)
    }

    /// Dispatch straight from the native arguments.
    ///
    /// # Safety
    ///
    /// `info` must be null or point to the payload structure the host
    /// defines for `cb_type`, valid for the duration of this call.
    pub unsafe fn dispatch_raw(&self, cb_type: c_int, info: *mut c_void) -> BridgeResult<bool>
    {
        let kind = CallbackType::from_raw(cb_type)?;
        let info = CallbackInfo::from_raw(kind, info);
        self.dispatch(&info)
    }
}

impl fmt::Debug for CallbackRegistry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CallbackRegistry")
            .field("registered", &self.registered())
            .finish_non_exhaustive()
    }
}

//! Command registry: name-keyed handlers for host commands.

use std::fmt;
use std::sync::{Arc, Mutex};

use libc::{c_char, c_int};
use tracing::{debug, warn};

use super::{host_name, lock, NamedSlots};
use crate::error::{BridgeError, BridgeResult, CallbackResult};
use crate::events::strings::utf8_c_string;
use crate::host::{CommandFn, Host};
use crate::types::PluginHandle;

/// Closure stored for a command. Receives the host-split argument words
/// (the command name itself is `args[0]` when the host includes it).
pub type CommandThunk = dyn Fn(&[String]) -> CallbackResult<bool> + Send + Sync;

struct CommandEntry
{
    owner: PluginHandle,
    thunk: Arc<CommandThunk>,
}

/// Name-keyed command table.
///
/// Every command occupies one of the registry's trampolines for as long as
/// it is registered.
pub struct CommandRegistry
{
    host: Arc<dyn Host>,
    trampolines: &'static [CommandFn],
    table: Mutex<NamedSlots<CommandEntry>>,
}

impl CommandRegistry
{
    /// Create an empty registry with one slot per trampoline.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, trampolines: &'static [CommandFn]) -> Self
    {
        Self {
            host,
            trampolines,
            table: Mutex::new(NamedSlots::new(trampolines.len())),
        }
    }

    /// Register a command handler.
    ///
    /// Returns `Ok(false)` if the host rejected the name (typically a
    /// duplicate); the existing registration is untouched.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// bridge.commands().register(handle, "hello", |args| {
    ///     tracing::info!(?args, "hello command");
    ///     Ok(true)
    /// }, false)?;
    /// ```
    pub fn register<F>(&self, owner: PluginHandle, name: &str, callback: F, debug_only: bool) -> BridgeResult<bool>
    where
        F: Fn(&[String]) -> CallbackResult<bool> + Send + Sync + 'static,
    {
        self.register_dyn(owner, name, Some(Arc::new(callback)), debug_only)
    }

    /// Core registration path.
    ///
    /// ## Errors
    ///
    /// - `NullName` / `InvalidName` for an empty name or one with a NUL
    /// - `NullCallback` if `callback` is `None`
    /// - `SlotsExhausted` if every trampoline is taken
    pub fn register_dyn(
        &self,
        owner: PluginHandle,
        name: &str,
        callback: Option<Arc<CommandThunk>>,
        debug_only: bool,
    ) -> BridgeResult<bool>
    {
        let c_name = host_name(name)?;
        let thunk = callback.ok_or(BridgeError::NullCallback)?;

        let mut table = lock(&self.table);
        if table.contains(name) {
            debug!(plugin = %owner, name, "command already registered");
            return Ok(false);
        }
        let slot = table.free_slot().ok_or(BridgeError::SlotsExhausted {
            registry: "command",
            capacity: table.capacity(),
        })?;

        table.reserve(slot, CommandEntry { owner, thunk });
        if !self.host.register_command(owner, &c_name, self.trampolines[slot], debug_only) {
            table.vacate(slot);
            warn!(plugin = %owner, name, "host rejected command registration");
            return Ok(false);
        }
        table.bind(name.to_string(), slot);
        debug!(plugin = %owner, name, slot, debug_only, "registered command");
        Ok(true)
    }

    /// Unregister a command.
    ///
    /// The request is forwarded even for names this registry does not know,
    /// and the local entry is removed only if the host confirms.
    ///
    /// ## Errors
    ///
    /// `NullName` / `InvalidName` for an empty name or one with a NUL.
    pub fn unregister(&self, owner: PluginHandle, name: &str) -> BridgeResult<bool>
    {
        let c_name = host_name(name)?;

        let mut table = lock(&self.table);
        if !self.host.unregister_command(owner, &c_name) {
            debug!(plugin = %owner, name, "host rejected command unregistration");
            return Ok(false);
        }
        if let Some((slot, entry)) = table.remove(name) {
            debug!(plugin = %owner, registered_by = %entry.owner, name, slot, "unregistered command");
        }
        Ok(true)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool
    {
        lock(&self.table).contains(name)
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String>
    {
        lock(&self.table).names()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize
    {
        lock(&self.table).len()
    }

    /// Whether no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Run the handler registered as `name` with already-split arguments.
    ///
    /// ## Errors
    ///
    /// `UnknownCommand` if nothing is registered under `name`, `Callback` if
    /// the handler failed.
    pub fn invoke<S: AsRef<str>>(&self, name: &str, args: &[S]) -> BridgeResult<bool>
    {
        let thunk = lock(&self.table)
            .get(name)
            .map(|entry| Arc::clone(&entry.thunk))
            .ok_or_else(|| BridgeError::UnknownCommand(name.to_string()))?;
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        thunk(&args).map_err(BridgeError::Callback)
    }

    /// Dispatch a trampoline call for `slot`.
    ///
    /// A vacant slot (unregistered while the host was calling) yields
    /// `Ok(false)`.
    ///
    /// # Safety
    ///
    /// `argv` must be null or point to `argc` pointers, each null or a
    /// NUL-terminated string, valid for the duration of this call.
    pub(crate) unsafe fn dispatch_slot(&self, slot: usize, argc: c_int, argv: *mut *mut c_char) -> BridgeResult<bool>
    {
        let thunk = lock(&self.table).slot(slot).map(|entry| Arc::clone(&entry.thunk));
        let Some(thunk) = thunk else {
            debug!(slot, "command trampoline fired for a vacant slot");
            return Ok(false);
        };
        let args = decode_args(argc, argv)?;
        thunk(&args).map_err(BridgeError::Callback)
    }
}

impl fmt::Debug for CommandRegistry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CommandRegistry")
            .field("names", &self.names())
            .field("capacity", &self.trampolines.len())
            .finish_non_exhaustive()
    }
}

/// Copy the host's `argc`/`argv` pair into owned strings.
///
/// A count of zero (or below) always yields an empty vector, even with a
/// null `argv`. Null elements become empty strings.
///
/// # Safety
///
/// See [`CommandRegistry::dispatch_slot`].
pub(crate) unsafe fn decode_args(argc: c_int, argv: *mut *mut c_char) -> BridgeResult<Vec<String>>
{
    let count = usize::try_from(argc).unwrap_or(0);
    if count == 0 {
        return Ok(Vec::new());
    }
    if argv.is_null() {
        return Err(BridgeError::NullPayload("argv"));
    }
    Ok((0..count)
        .map(|i| utf8_c_string(argv.add(i).read()).unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests
{
    use std::ffi::CString;
    use std::ptr;

    use super::*;

    #[test]
    fn test_zero_count_is_empty_not_null()
    {
        let args = unsafe { decode_args(0, ptr::null_mut()) }.unwrap();
        assert!(args.is_empty());

        let args = unsafe { decode_args(-3, ptr::null_mut()) }.unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_null_argv_with_count_is_an_error()
    {
        let result = unsafe { decode_args(2, ptr::null_mut()) };
        assert!(matches!(result, Err(BridgeError::NullPayload("argv"))));
    }

    #[test]
    fn test_args_are_copied_in_order()
    {
        let owned: Vec<CString> = ["bpx", "kernel32.CreateFileW"]
            .iter()
            .map(|s| CString::new(*s).unwrap())
            .collect();
        let mut argv: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr().cast_mut()).collect();
        argv.push(ptr::null_mut());

        let args = unsafe { decode_args(3, argv.as_mut_ptr()) }.unwrap();
        assert_eq!(args, ["bpx", "kernel32.CreateFileW", ""]);
    }
}

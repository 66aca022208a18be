//! # Host Interface
//!
//! The narrow surface of the host module the bridge depends on.
//!
//! Every method mirrors one exported `_plugin_*` function of the host (see
//! [`crate::native`]). Keeping it behind a trait lets the registries be
//! driven by a recording host in tests and keeps all `extern` declarations in
//! one place.
//!
//! ## Calling convention
//!
//! All function pointers handed to the host are `extern "C"`, which is cdecl
//! on 32-bit Windows and the Microsoft x64 convention on 64-bit Windows,
//! exactly what the host expects.

use std::ffi::CStr;

use libc::{c_char, c_int, c_void};

use crate::types::{CallbackType, MenuEntryId, MenuHandle, PluginHandle};

/// `CBPLUGIN`: event callback; `info` points at the `PLUG_CB_*` payload.
pub type CallbackFn = unsafe extern "C" fn(cb_type: c_int, info: *mut c_void);

/// `CBPLUGINCOMMAND`: command handler receiving host-split arguments.
pub type CommandFn = unsafe extern "C" fn(argc: c_int, argv: *mut *mut c_char) -> bool;

/// `CBPLUGINEXPRFUNCTION`: expression function returning a machine word.
pub type ExprFunctionFn = unsafe extern "C" fn(argc: c_int, argv: *const usize, userdata: *mut c_void) -> usize;

/// Operations exported by the host module.
///
/// Implementations must be callable from any thread. Boolean results are the
/// host's verdict: `false` means it rejected the request (duplicate name,
/// unknown handle, capacity), which is not an error on our side.
pub trait Host: Send + Sync
{
    /// `_plugin_registercallback`. Replaces any callback of that type for
    /// `plugin`.
    fn register_callback(&self, plugin: PluginHandle, cb_type: CallbackType, callback: CallbackFn);

    /// `_plugin_unregistercallback`.
    fn unregister_callback(&self, plugin: PluginHandle, cb_type: CallbackType) -> bool;

    /// `_plugin_registercommand`.
    fn register_command(&self, plugin: PluginHandle, name: &CStr, callback: CommandFn, debug_only: bool) -> bool;

    /// `_plugin_unregistercommand`.
    fn unregister_command(&self, plugin: PluginHandle, name: &CStr) -> bool;

    /// `_plugin_registerexprfunction`. `userdata` is echoed back verbatim on
    /// every call of `callback`.
    fn register_expr_function(
        &self,
        plugin: PluginHandle,
        name: &CStr,
        argc: c_int,
        callback: ExprFunctionFn,
        userdata: usize,
    ) -> bool;

    /// `_plugin_unregisterexprfunction`.
    fn unregister_expr_function(&self, plugin: PluginHandle, name: &CStr) -> bool;

    /// `_plugin_logprint`: formatted print line.
    fn log_print(&self, text: &CStr);

    /// `_plugin_logputs`: raw print.
    fn log_puts(&self, text: &CStr);

    /// `_plugin_menuadd`. Returns the new submenu handle, or `-1`.
    fn menu_add(&self, parent: MenuHandle, title: &CStr) -> c_int;

    /// `_plugin_menuaddentry`.
    fn menu_add_entry(&self, menu: MenuHandle, entry: MenuEntryId, title: &CStr) -> bool;

    /// `_plugin_menuremove`.
    fn menu_remove(&self, menu: MenuHandle) -> bool;

    /// `_plugin_menuentryremove`.
    fn menu_entry_remove(&self, plugin: PluginHandle, entry: MenuEntryId) -> bool;

    /// `_plugin_menuclear`.
    fn menu_clear(&self, menu: MenuHandle) -> bool;

    /// `_plugin_debugskipexceptions`.
    fn debug_skip_exceptions(&self, skip: bool);
}

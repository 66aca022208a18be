//! # Host Module FFI Declarations
//!
//! `extern "C"` declarations of the `_plugin_*` functions exported by the
//! debugger (`x64dbg.dll` on 64-bit, `x32dbg.dll` on 32-bit), and
//! [`NativeHost`], the [`Host`] implementation that calls them.
//!
//! The module is linked with `kind = "raw-dylib"`, so no import library from
//! the plugin SDK is needed at build time.
//!
//! ## Safety Notes
//!
//! The host owns every pointer it hands out and copies every string we pass
//! in before returning, so borrowed `&CStr` arguments only need to live for
//! the duration of the call.
//!
//! ## References
//!
//! - [`_plugins.h`](https://github.com/x64dbg/x64dbg/blob/development/src/dbg/_plugins.h)

use std::ffi::CStr;

use libc::{c_char, c_int};

use crate::host::{CallbackFn, CommandFn, ExprFunctionFn, Host};
use crate::types::{CallbackType, MenuEntryId, MenuHandle, PluginHandle};

#[cfg_attr(target_pointer_width = "64", link(name = "x64dbg", kind = "raw-dylib"))]
#[cfg_attr(
    target_pointer_width = "32",
    link(name = "x32dbg", kind = "raw-dylib", import_name_type = "undecorated")
)]
extern "C" {
    // Logging
    fn _plugin_logprint(text: *const c_char);
    fn _plugin_logputs(text: *const c_char);

    // Callbacks
    fn _plugin_registercallback(plugin_handle: c_int, cb_type: c_int, cb_plugin: CallbackFn);
    fn _plugin_unregistercallback(plugin_handle: c_int, cb_type: c_int) -> bool;

    // Commands
    fn _plugin_registercommand(plugin_handle: c_int, command: *const c_char, cb_command: CommandFn, debug_only: bool) -> bool;
    fn _plugin_unregistercommand(plugin_handle: c_int, command: *const c_char) -> bool;

    // Expression functions
    fn _plugin_registerexprfunction(
        plugin_handle: c_int,
        name: *const c_char,
        argc: c_int,
        cb_function: ExprFunctionFn,
        userdata: usize,
    ) -> bool;
    fn _plugin_unregisterexprfunction(plugin_handle: c_int, name: *const c_char) -> bool;

    // Menus
    fn _plugin_menuadd(h_menu: c_int, title: *const c_char) -> c_int;
    fn _plugin_menuaddentry(h_menu: c_int, h_entry: c_int, title: *const c_char) -> bool;
    fn _plugin_menuremove(h_menu: c_int) -> bool;
    fn _plugin_menuentryremove(plugin_handle: c_int, h_entry: c_int) -> bool;
    fn _plugin_menuclear(h_menu: c_int) -> bool;

    fn _plugin_debugskipexceptions(skip: bool);
}

/// [`Host`] backed by the real debugger exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl Host for NativeHost
{
    fn register_callback(&self, plugin: PluginHandle, cb_type: CallbackType, callback: CallbackFn)
    {
        unsafe { _plugin_registercallback(plugin.raw(), cb_type.raw(), callback) }
    }

    fn unregister_callback(&self, plugin: PluginHandle, cb_type: CallbackType) -> bool
    {
        unsafe { _plugin_unregistercallback(plugin.raw(), cb_type.raw()) }
    }

    fn register_command(&self, plugin: PluginHandle, name: &CStr, callback: CommandFn, debug_only: bool) -> bool
    {
        unsafe { _plugin_registercommand(plugin.raw(), name.as_ptr(), callback, debug_only) }
    }

    fn unregister_command(&self, plugin: PluginHandle, name: &CStr) -> bool
    {
        unsafe { _plugin_unregistercommand(plugin.raw(), name.as_ptr()) }
    }

    fn register_expr_function(
        &self,
        plugin: PluginHandle,
        name: &CStr,
        argc: c_int,
        callback: ExprFunctionFn,
        userdata: usize,
    ) -> bool
    {
        unsafe { _plugin_registerexprfunction(plugin.raw(), name.as_ptr(), argc, callback, userdata) }
    }

    fn unregister_expr_function(&self, plugin: PluginHandle, name: &CStr) -> bool
    {
        unsafe { _plugin_unregisterexprfunction(plugin.raw(), name.as_ptr()) }
    }

    fn log_print(&self, text: &CStr)
    {
        unsafe { _plugin_logprint(text.as_ptr()) }
    }

    fn log_puts(&self, text: &CStr)
    {
        unsafe { _plugin_logputs(text.as_ptr()) }
    }

    fn menu_add(&self, parent: MenuHandle, title: &CStr) -> c_int
    {
        unsafe { _plugin_menuadd(parent.0, title.as_ptr()) }
    }

    fn menu_add_entry(&self, menu: MenuHandle, entry: MenuEntryId, title: &CStr) -> bool
    {
        unsafe { _plugin_menuaddentry(menu.0, entry.0, title.as_ptr()) }
    }

    fn menu_remove(&self, menu: MenuHandle) -> bool
    {
        unsafe { _plugin_menuremove(menu.0) }
    }

    fn menu_entry_remove(&self, plugin: PluginHandle, entry: MenuEntryId) -> bool
    {
        unsafe { _plugin_menuentryremove(plugin.raw(), entry.0) }
    }

    fn menu_clear(&self, menu: MenuHandle) -> bool
    {
        unsafe { _plugin_menuclear(menu.0) }
    }

    fn debug_skip_exceptions(&self, skip: bool)
    {
        unsafe { _plugin_debugskipexceptions(skip) }
    }
}

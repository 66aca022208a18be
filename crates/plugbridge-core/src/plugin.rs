//! The plugin's business logic, as seen by the bridge.
//!
//! Implement [`Plugin`] and hand it to
//! [`Bridge::attach_plugin`](crate::bridge::Bridge::attach_plugin); the
//! bridge registers the callbacks below and forwards decoded payloads.
//!
//! ```rust
//! use plugbridge_core::error::CallbackResult;
//! use plugbridge_core::payload::LoadDll;
//! use plugbridge_core::plugin::Plugin;
//!
//! struct ModuleLogger;
//!
//! impl Plugin for ModuleLogger
//! {
//!     fn name(&self) -> &str
//!     {
//!         "ModuleLogger"
//!     }
//!
//!     fn on_load_dll(&self, event: &LoadDll) -> CallbackResult<()>
//!     {
//!         tracing::info!(module = ?event.module_name, "module loaded");
//!         Ok(())
//!     }
//! }
//! ```

use libc::c_int;

use crate::error::CallbackResult;
use crate::payload::{CreateProcess, InitDebug, LoadDll};
use crate::types::{CallbackType, MenuEntryId, PlugSetupStruct, PluginHandle};

/// Callback types [`Plugin`] hooks are attached to.
pub const PLUGIN_CALLBACKS: [CallbackType; 5] = [
    CallbackType::InitDebug,
    CallbackType::StopDebug,
    CallbackType::CreateProcess,
    CallbackType::LoadDll,
    CallbackType::MenuEntry,
];

/// A plugin hosted by the bridge.
///
/// Every hook has an empty default. Errors returned from hooks are contained
/// at the native boundary and reported, never passed to the host.
pub trait Plugin: Send + Sync
{
    /// Display name written into `PLUG_INITSTRUCT`.
    fn name(&self) -> &str;

    /// Plugin version written into `PLUG_INITSTRUCT`.
    fn version(&self) -> c_int
    {
        1
    }

    /// Called once the host assigned `handle`. Returning `false` aborts loading.
    fn init(&self, _handle: PluginHandle) -> CallbackResult<bool>
    {
        Ok(true)
    }

    /// Called with the host's menu handles after a successful [`Self::init`].
    fn setup(&self, _setup: &PlugSetupStruct) -> CallbackResult<()>
    {
        Ok(())
    }

    /// Called before the plugin is unloaded.
    fn stop(&self) -> CallbackResult<()>
    {
        Ok(())
    }

    /// `CB_INITDEBUG`
    fn on_init_debug(&self, _event: &InitDebug) -> CallbackResult<()>
    {
        Ok(())
    }

    /// `CB_STOPDEBUG`
    fn on_stop_debug(&self) -> CallbackResult<()>
    {
        Ok(())
    }

    /// `CB_CREATEPROCESS`
    fn on_create_process(&self, _event: &CreateProcess) -> CallbackResult<()>
    {
        Ok(())
    }

    /// `CB_LOADDLL`
    fn on_load_dll(&self, _event: &LoadDll) -> CallbackResult<()>
    {
        Ok(())
    }

    /// `CB_MENUENTRY`
    fn on_menu_entry(&self, _entry: MenuEntryId) -> CallbackResult<()>
    {
        Ok(())
    }
}

//! # Types
//!
//! Plain data types shared by the registries, the host seam, and the
//! decoders: callback type codes, plugin/menu handles, the bounded plugin
//! name, and debuggee addresses.

pub mod address;
pub mod callback;
pub mod plugin;

// Re-export all public types
pub use address::Address;
pub use callback::CallbackType;
pub use plugin::{
    MenuEntryId, MenuHandle, PlugInitStruct, PlugSetupStruct, PluginHandle, PluginName, PluginNameError, PLUGIN_NAME_SIZE,
    PLUG_SDKVERSION,
};

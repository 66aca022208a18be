//! # plugbridge-core
//!
//! Native callback bridge for x64dbg-style debugger plugins.
//!
//! This crate provides everything between the host's C ABI and plugin code:
//! - Event callback, command, and expression function registries
//! - Opaque handles carrying user data through the host
//! - Decoding of the Win32 debug-event structures the host passes in
//! - Fault containment at every native entry point
//!
//! ## Platform Support
//!
//! - **Windows (x86, x86_64)**: links against `x32dbg` / `x64dbg` through
//!   [`native::NativeHost`]
//! - **Everything else**: the registries, decoder and handle table build and
//!   run against any [`host::Host`] implementation (used by the tests and the
//!   `plugbridge` layout tool)
//!
//! ## Why unsafe code is needed
//!
//! The host calls us through bare C function pointers and hands us raw
//! pointers into its own memory. Reading those structures, decoding C strings
//! and exporting `extern "C"` entry points cannot be expressed in safe Rust.
//! The unsafe parts are confined to [`events`], [`payload`], the registries'
//! dispatch paths and the trampolines.

#![allow(unsafe_code)] // Required for the host's C ABI

pub mod bridge;
pub mod error;
pub mod events;
pub mod guard;
pub mod handles;
pub mod host;
#[cfg(windows)]
pub mod native;
pub mod payload;
pub mod plugin;
pub mod registry;
mod trampolines;
pub mod types;

pub use bridge::Bridge;
// Re-export commonly used types
pub use error::{BridgeError, BridgeResult, CallbackError, CallbackResult};
pub use events::{DebugEvent, DebugEventCode, DebugEventPayload, ExceptionRecord};
pub use guard::{contain, Fault, FaultSink};
pub use handles::{HandleTable, OpaqueHandle, UserData};
pub use host::Host;
#[cfg(windows)]
pub use native::NativeHost;
pub use payload::CallbackInfo;
pub use plugin::Plugin;
pub use trampolines::TRAMPOLINE_SLOTS;
pub use types::{Address, CallbackType, MenuEntryId, MenuHandle, PluginHandle, PluginName};

//! # Debug Events
//!
//! Decoding of the Win32 debug-event structures the host passes to
//! `CB_DEBUGEVENT`, `CB_EXCEPTION`, `CB_LOADDLL`, and friends.
//!
//! - [`layout`]: byte-exact `#[repr(C)]` mirrors of the host structures
//! - [`decoder`]: discriminant-first decoding into owned Rust values
//! - [`exception`]: exception records with lazy parent-chain access
//!
//! Decoded values borrow the dispatch lifetime only where they keep a host
//! pointer (the exception chain); everything else, strings included, is
//! copied out immediately.

pub mod decoder;
pub mod exception;
pub mod layout;
pub(crate) mod strings;

pub use decoder::{
    CreateProcessInfo, CreateThreadInfo, DebugEvent, DebugEventCode, DebugEventPayload, ExitInfo, LoadDllInfo,
    OutputDebugStringInfo, RipInfo, UnloadDllInfo,
};
pub use exception::{ExceptionChain, ExceptionDebugInfo, ExceptionRecord, MAX_EXCEPTION_CHAIN_DEPTH};
pub use layout::EXCEPTION_MAXIMUM_PARAMETERS;
pub use strings::MAX_STRING_UNITS;

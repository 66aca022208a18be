//! # Error Types
//!
//! General error handling for the plugin bridge.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Nothing in this module ever crosses the native boundary: registration
//! functions hand these errors back to the (Rust) caller, and every dispatch
//! path converts them into the call shape's safe default inside
//! [`crate::guard`].

use thiserror::Error;

use crate::types::CallbackType;

/// Error produced by a user callback.
///
/// Callbacks are free to use their own error types; they only need to be
/// boxable so the containment wrapper can log them.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by user callbacks.
pub type CallbackResult<T> = std::result::Result<T, CallbackError>;

/// Main error type for bridge operations
///
/// ## Error Categories
///
/// 1. **Contract violations**: InvalidEventType, NullCallback, NullName, InvalidName, InvalidArity
/// 2. **Resolution errors**: UnknownCommand, UnknownFunction, StaleHandle
/// 3. **Resource errors**: SlotsExhausted, HandleTableFull
/// 4. **Payload errors**: NullPayload, PayloadMismatch, UnknownDebugEvent
/// 5. **Lifecycle errors**: AlreadyInstalled, NotInstalled
/// 6. **Callback errors**: Callback (a user callback returned `Err`)
///
/// Host rejections (duplicate names, host-side limits) are *not* errors. They
/// are reported as `Ok(false)` by the registries.
#[derive(Error, Debug)]
pub enum BridgeError
{
    /// The callback type code is outside `[0, CB_LAST)`.
    #[error("Invalid callback type: {0} (expected 0..{count})", count = CallbackType::COUNT)]
    InvalidEventType(i32),

    /// A callback was required but none was supplied.
    #[error("Callback must not be null")]
    NullCallback,

    /// A command or expression function name was required but empty.
    #[error("Name must not be null or empty")]
    NullName,

    /// The name cannot be passed to the host as a C string.
    #[error("Invalid name {name:?}: contains an interior NUL byte")]
    InvalidName
    {
        /// The offending name
        name: String,
    },

    /// Expression function arity must be non-negative.
    #[error("Invalid expression function arity: {0}")]
    InvalidArity(i32),

    /// No command with this name is registered.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// No expression function with this name is registered.
    #[error("Unknown expression function: {0}")]
    UnknownFunction(String),

    /// The opaque handle was never issued or has already been released.
    #[error("Stale or unknown opaque handle: 0x{0:x}")]
    StaleHandle(usize),

    /// All native trampolines of a name-keyed registry are in use.
    ///
    /// The host only stores bare function pointers, so each command and
    /// expression function needs its own trampoline for its whole lifetime.
    #[error("No free {registry} trampoline (capacity {capacity})")]
    SlotsExhausted
    {
        /// Registry that ran out of trampolines
        registry: &'static str,
        /// Total number of trampolines for that registry
        capacity: usize,
    },

    /// The opaque handle table cannot address any more entries.
    #[error("Opaque handle table is full")]
    HandleTableFull,

    /// The host passed a null pointer where a payload was required.
    #[error("Null payload pointer: {0}")]
    NullPayload(&'static str),

    /// A payload accessor was used for a different callback type.
    #[error("Payload mismatch: expected {expected:?}, dispatch carries {actual:?}")]
    PayloadMismatch
    {
        /// Callback type the accessor decodes
        expected: CallbackType,
        /// Callback type of the current dispatch
        actual: CallbackType,
    },

    /// The debug event discriminant is not one of the nine known codes.
    #[error("Unknown debug event code: {0}")]
    UnknownDebugEvent(u32),

    /// `Bridge::install` was called twice.
    #[error("A bridge is already installed for this process")]
    AlreadyInstalled,

    /// A trampoline fired before any bridge was installed.
    #[error("No bridge installed")]
    NotInstalled,

    /// A user callback returned an error.
    #[error("Callback failed: {0}")]
    Callback(CallbackError),
}

impl BridgeError
{
    /// Whether this error is a contract violation detected before the host
    /// was touched.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool
    {
        matches!(
            self,
            Self::InvalidEventType(_)
                | Self::NullCallback
                | Self::NullName
                | Self::InvalidName { .. }
                | Self::InvalidArity(_)
        )
    }
}

/// Convenience type alias for `Result<T, BridgeError>`
///
/// ```rust
/// use plugbridge_core::error::BridgeResult;
/// fn foo() -> BridgeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

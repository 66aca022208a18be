//! Expression function registry.
//!
//! Expression functions return one machine word to the host's expression
//! evaluator. Optional user data is anchored in the [`HandleTable`] for the
//! registration's lifetime and reaches the host only as an opaque token.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use libc::c_int;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::{host_name, lock, NamedSlots};
use crate::error::{BridgeError, BridgeResult, CallbackResult};
use crate::handles::{HandleTable, OpaqueHandle, UserData};
use crate::host::{ExprFunctionFn, Host};
use crate::types::PluginHandle;

/// Expression function receiving its arguments as decoded words.
pub type WordsExprFn = dyn Fn(&[usize], Option<&UserData>) -> CallbackResult<usize> + Send + Sync;

/// Expression function receiving the host's argument buffer untouched.
pub type RawExprFn = dyn Fn(RawArgs<'_>, Option<&UserData>) -> CallbackResult<usize> + Send + Sync;

/// The two supported callback shapes.
#[derive(Clone)]
pub enum ExprThunk
{
    /// Arguments copied into a word slice first
    Words(Arc<WordsExprFn>),
    /// Count and pointer passed through
    Raw(Arc<RawExprFn>),
}

impl ExprThunk
{
    fn call(&self, args: RawArgs<'_>, userdata: Option<&UserData>) -> CallbackResult<usize>
    {
        match self {
            Self::Words(f) => {
                let words: SmallVec<[usize; 8]> = args.iter().collect();
                f(&words, userdata)
            }
            Self::Raw(f) => f(args, userdata),
        }
    }
}

impl fmt::Debug for ExprThunk
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Words(_) => f.write_str("ExprThunk::Words"),
            Self::Raw(_) => f.write_str("ExprThunk::Raw"),
        }
    }
}

/// Zero-copy view of the host's argument buffer.
#[derive(Clone, Copy)]
pub struct RawArgs<'a>
{
    argc: c_int,
    argv: *const usize,
    _buffer: PhantomData<&'a [usize]>,
}

impl<'a> RawArgs<'a>
{
    /// Wrap a host argument buffer.
    ///
    /// # Safety
    ///
    /// If `argc > 0`, `argv` must point to `argc` readable words that stay
    /// valid for `'a`.
    #[must_use]
    pub unsafe fn from_raw(argc: c_int, argv: *const usize) -> Self
    {
        Self {
            argc,
            argv,
            _buffer: PhantomData,
        }
    }

    /// Wrap an in-process slice.
    #[must_use]
    pub fn from_slice(words: &'a [usize]) -> Self
    {
        Self {
            argc: c_int::try_from(words.len()).unwrap_or(c_int::MAX),
            argv: words.as_ptr(),
            _buffer: PhantomData,
        }
    }

    /// Count exactly as the host passed it.
    #[must_use]
    pub fn argc(&self) -> c_int
    {
        self.argc
    }

    /// Pointer exactly as the host passed it.
    #[must_use]
    pub fn as_ptr(&self) -> *const usize
    {
        self.argv
    }

    /// Number of readable words (negative counts and null buffers read as 0).
    #[must_use]
    pub fn len(&self) -> usize
    {
        if self.argv.is_null() {
            0
        } else {
            usize::try_from(self.argc).unwrap_or(0)
        }
    }

    /// Whether there are no readable words.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Word at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<usize>
    {
        // SAFETY: index < len, and the buffer holds len words per from_raw's contract.
        (index < self.len()).then(|| unsafe { self.argv.add(index).read_unaligned() })
    }

    /// Iterate the words in order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + 'a
    {
        let args = *self;
        (0..args.len()).filter_map(move |i| args.get(i))
    }
}

impl fmt::Debug for RawArgs<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_list().entries(self.iter()).finish()
    }
}

struct ExprEntry
{
    owner: PluginHandle,
    arity: c_int,
    thunk: ExprThunk,
    handle: OpaqueHandle,
}

/// Name-keyed expression function table.
pub struct ExprFunctionRegistry
{
    host: Arc<dyn Host>,
    handles: Arc<HandleTable>,
    trampolines: &'static [ExprFunctionFn],
    table: Mutex<NamedSlots<ExprEntry>>,
}

impl ExprFunctionRegistry
{
    /// Create an empty registry anchoring user data in `handles`.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, handles: Arc<HandleTable>, trampolines: &'static [ExprFunctionFn]) -> Self
    {
        Self {
            host,
            handles,
            trampolines,
            table: Mutex::new(NamedSlots::new(trampolines.len())),
        }
    }

    /// Register a function over decoded argument words.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// let scale: Arc<UserData> = Arc::new(4usize);
    /// bridge.expr_functions().register(handle, "scaled", 1, |args, data| {
    ///     let factor = data.and_then(|d| d.downcast_ref::<usize>()).copied().unwrap_or(1);
    ///     Ok(args[0] * factor)
    /// }, Some(scale))?;
    /// ```
    pub fn register<F>(
        &self,
        owner: PluginHandle,
        name: &str,
        arity: c_int,
        callback: F,
        userdata: Option<Arc<UserData>>,
    ) -> BridgeResult<bool>
    where
        F: Fn(&[usize], Option<&UserData>) -> CallbackResult<usize> + Send + Sync + 'static,
    {
        self.register_dyn(owner, name, arity, Some(ExprThunk::Words(Arc::new(callback))), userdata)
    }

    /// Register a function over the raw argument buffer.
    pub fn register_raw<F>(
        &self,
        owner: PluginHandle,
        name: &str,
        arity: c_int,
        callback: F,
        userdata: Option<Arc<UserData>>,
    ) -> BridgeResult<bool>
    where
        F: Fn(RawArgs<'_>, Option<&UserData>) -> CallbackResult<usize> + Send + Sync + 'static,
    {
        self.register_dyn(owner, name, arity, Some(ExprThunk::Raw(Arc::new(callback))), userdata)
    }

    /// Core registration path shared by both callback shapes.
    ///
    /// A handle is acquired only for `Some(userdata)`, and released again if
    /// the host rejects the function.
    ///
    /// ## Errors
    ///
    /// - `NullName` / `InvalidName`, `InvalidArity`, `NullCallback`
    /// - `SlotsExhausted` if every trampoline is taken
    /// - `HandleTableFull` if the user data cannot be anchored
    pub fn register_dyn(
        &self,
        owner: PluginHandle,
        name: &str,
        arity: c_int,
        callback: Option<ExprThunk>,
        userdata: Option<Arc<UserData>>,
    ) -> BridgeResult<bool>
    {
        let c_name = host_name(name)?;
        if arity < 0 {
            return Err(BridgeError::InvalidArity(arity));
        }
        let thunk = callback.ok_or(BridgeError::NullCallback)?;

        let mut table = lock(&self.table);
        if table.contains(name) {
            debug!(plugin = %owner, name, "expression function already registered");
            return Ok(false);
        }
        let slot = table.free_slot().ok_or(BridgeError::SlotsExhausted {
            registry: "expression function",
            capacity: table.capacity(),
        })?;
        let handle = match userdata {
            Some(value) => self.handles.acquire(value)?,
            None => OpaqueHandle::NULL,
        };

        table.reserve(
            slot,
            ExprEntry {
                owner,
                arity,
                thunk,
                handle,
            },
        );
        let accepted = self
            .host
            .register_expr_function(owner, &c_name, arity, self.trampolines[slot], handle.raw());
        if !accepted {
            table.vacate(slot);
            self.release(handle);
            warn!(plugin = %owner, name, "host rejected expression function registration");
            return Ok(false);
        }
        table.bind(name.to_string(), slot);
        debug!(plugin = %owner, name, arity, slot, %handle, "registered expression function");
        Ok(true)
    }

    /// Unregister an expression function and release its user data.
    ///
    /// ## Errors
    ///
    /// `UnknownFunction` if `name` is not registered here.
    pub fn unregister(&self, owner: PluginHandle, name: &str) -> BridgeResult<bool>
    {
        let mut table = lock(&self.table);
        if !table.contains(name) {
            return Err(BridgeError::UnknownFunction(name.to_string()));
        }
        let c_name = host_name(name)?;
        if !self.host.unregister_expr_function(owner, &c_name) {
            debug!(plugin = %owner, name, "host rejected expression function unregistration");
            return Ok(false);
        }
        if let Some((slot, entry)) = table.remove(name) {
            self.release(entry.handle);
            debug!(plugin = %owner, registered_by = %entry.owner, name, slot, "unregistered expression function");
        }
        Ok(true)
    }

    fn release(&self, handle: OpaqueHandle)
    {
        if handle.is_null() {
            return;
        }
        if let Err(err) = self.handles.release(handle) {
            warn!(%handle, "failed to release expression function user data: {err}");
        }
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool
    {
        lock(&self.table).contains(name)
    }

    /// Declared arity of `name`.
    #[must_use]
    pub fn arity(&self, name: &str) -> Option<c_int>
    {
        lock(&self.table).get(name).map(|entry| entry.arity)
    }

    /// Registered function names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String>
    {
        lock(&self.table).names()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize
    {
        lock(&self.table).len()
    }

    /// Whether no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Evaluate `name` in-process.
    ///
    /// ## Errors
    ///
    /// `UnknownFunction` if nothing is registered under `name`, `Callback` if
    /// the function failed.
    pub fn evaluate(&self, name: &str, args: &[usize]) -> BridgeResult<usize>
    {
        let (thunk, handle) = lock(&self.table)
            .get(name)
            .map(|entry| (entry.thunk.clone(), entry.handle))
            .ok_or_else(|| BridgeError::UnknownFunction(name.to_string()))?;
        self.call(&thunk, RawArgs::from_slice(args), handle)
    }

    /// Dispatch a trampoline call for `slot`.
    ///
    /// `userdata` is the token the host echoes back; it is resolved here,
    /// so a zero token reaches the callback as `None`. A vacant slot yields
    /// `Ok(0)`.
    ///
    /// # Safety
    ///
    /// See [`RawArgs::from_raw`].
    pub(crate) unsafe fn dispatch_slot(
        &self,
        slot: usize,
        argc: c_int,
        argv: *const usize,
        userdata: usize,
    ) -> BridgeResult<usize>
    {
        let thunk = lock(&self.table).slot(slot).map(|entry| entry.thunk.clone());
        let Some(thunk) = thunk else {
            debug!(slot, "expression trampoline fired for a vacant slot");
            return Ok(0);
        };
        self.call(&thunk, RawArgs::from_raw(argc, argv), OpaqueHandle::from_raw(userdata))
    }

    fn call(&self, thunk: &ExprThunk, args: RawArgs<'_>, handle: OpaqueHandle) -> BridgeResult<usize>
    {
        let userdata = self.handles.resolve(handle);
        thunk.call(args, userdata.as_deref()).map_err(BridgeError::Callback)
    }
}

impl fmt::Debug for ExprFunctionRegistry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ExprFunctionRegistry")
            .field("names", &self.names())
            .field("capacity", &self.trampolines.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_raw_args_clamp_to_readable_words()
    {
        let words = [1usize, 2, 3];
        let args = RawArgs::from_slice(&words);
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(2), Some(3));
        assert_eq!(args.get(3), None);
        assert_eq!(args.iter().collect::<Vec<_>>(), words);

        let negative = unsafe { RawArgs::from_raw(-1, words.as_ptr()) };
        assert!(negative.is_empty());

        let null = unsafe { RawArgs::from_raw(4, std::ptr::null()) };
        assert!(null.is_empty());
        assert_eq!(null.argc(), 4);
    }

    #[test]
    fn test_words_shape_sees_decoded_copy()
    {
        let thunk = ExprThunk::Words(Arc::new(|args: &[usize], _: Option<&UserData>| Ok(args.iter().sum())));
        let words = [40usize, 2];
        assert_eq!(thunk.call(RawArgs::from_slice(&words), None).unwrap(), 42);
    }
}

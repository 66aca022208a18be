//! # Opaque Handles
//!
//! The host can only carry flat pointer-sized integers back to us (for
//! example the `userdata` argument of an expression function). This module
//! issues such integers as tokens for owned Rust values and resolves them
//! again on dispatch.
//!
//! ## Token layout
//!
//! A token packs a slot index and a generation counter:
//!
//! ```text
//! | generation (high half) | slot index + 1 (low half) |
//! ```
//!
//! The `+ 1` keeps every issued token non-zero, so `0` always means "no user
//! data". Releasing a slot bumps its generation, so an old token for a
//! reused slot no longer matches and resolves to `None` instead of to the
//! new occupant.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::error::{BridgeError, BridgeResult};

/// Value anchored behind an opaque handle.
pub type UserData = dyn Any + Send + Sync;

const INDEX_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: usize = usize::MAX >> INDEX_BITS;

/// Token handed to the host in place of a Rust reference.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpaqueHandle(usize);

impl OpaqueHandle
{
    /// The "no user data" token.
    pub const NULL: Self = OpaqueHandle(0);

    /// Reinterpret a raw token received from the host.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self
    {
        Self(raw)
    }

    /// The raw token as passed to the host.
    #[must_use]
    pub const fn raw(self) -> usize
    {
        self.0
    }

    /// Whether this is the null token.
    #[must_use]
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    fn pack(index: usize, generation: usize) -> Self
    {
        Self(((generation & GENERATION_MASK) << INDEX_BITS) | (index + 1))
    }

    fn unpack(self) -> Option<(usize, usize)>
    {
        let low = self.0 & INDEX_MASK;
        (low != 0).then(|| (low - 1, self.0 >> INDEX_BITS))
    }
}

impl fmt::Display for OpaqueHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

struct Slot
{
    generation: usize,
    value: Option<Arc<UserData>>,
}

#[derive(Default)]
struct Slots
{
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

/// Generation-checked table of anchored values.
///
/// Safe to share between threads; every operation takes a short internal
/// lock and never calls out while holding it.
#[derive(Default)]
pub struct HandleTable
{
    inner: Mutex<Slots>,
}

impl HandleTable
{
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Anchor `value` and return a non-null token for it.
    ///
    /// ## Errors
    ///
    /// - `HandleTableFull`: every addressable slot is occupied
    pub fn acquire(&self, value: Arc<UserData>) -> BridgeResult<OpaqueHandle>
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let index = if let Some(index) = inner.free.pop() {
            index
        } else {
            let index = inner.slots.len();
            if index >= INDEX_MASK {
                return Err(BridgeError::HandleTableFull);
            }
            inner.slots.push(Slot {
                generation: 0,
                value: None,
            });
            index
        };

        let slot = &mut inner.slots[index];
        slot.value = Some(value);
        let handle = OpaqueHandle::pack(index, slot.generation);
        inner.live += 1;
        trace!(handle = %handle, "acquired opaque handle");
        Ok(handle)
    }

    /// Drop the anchor behind `handle`.
    ///
    /// Values still borrowed by an in-flight dispatch (through an `Arc`
    /// returned by [`Self::resolve`]) stay alive until that dispatch ends.
    ///
    /// ## Errors
    ///
    /// - `StaleHandle`: the token is null, was never issued, or was already
    ///   released
    pub fn release(&self, handle: OpaqueHandle) -> BridgeResult<()>
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (index, generation) = handle.unpack().ok_or(BridgeError::StaleHandle(handle.raw()))?;
        let slot = inner
            .slots
            .get_mut(index)
            .filter(|slot| slot.value.is_some() && slot.generation & GENERATION_MASK == generation)
            .ok_or(BridgeError::StaleHandle(handle.raw()))?;

        slot.value = None;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(index);
        inner.live -= 1;
        trace!(handle = %handle, "released opaque handle");
        Ok(())
    }

    /// Look up the value behind `handle`.
    ///
    /// Null, never-issued, and released tokens all resolve to `None`.
    #[must_use]
    pub fn resolve(&self, handle: OpaqueHandle) -> Option<Arc<UserData>>
    {
        let (index, generation) = handle.unpack()?;
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .slots
            .get(index)
            .filter(|slot| slot.generation & GENERATION_MASK == generation)
            .and_then(|slot| slot.value.clone())
    }

    /// Number of live (acquired and not yet released) handles.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).live
    }

    /// Whether no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

impl fmt::Debug for HandleTable
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("HandleTable").field("live", &self.len()).finish()
    }
}

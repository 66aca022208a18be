//! # Registries
//!
//! Three tables map what the host can call back into Rust closures:
//!
//! - [`CallbackRegistry`]: one slot per [`CallbackType`](crate::types::CallbackType)
//! - [`CommandRegistry`]: name-keyed command handlers
//! - [`ExprFunctionRegistry`]: name-keyed expression functions with user data
//!
//! ## Locking
//!
//! Each registry has its own mutex. It covers the table bookkeeping *and* the
//! synchronous host call that registers or unregisters an entry, so the local
//! table and the host never disagree. It is never held while a user closure
//! runs: dispatch clones the closure's `Arc`, drops the guard, then calls it.
//! A handler may therefore register or unregister entries from inside its own
//! dispatch.
//!
//! ## Lifetime
//!
//! An entry owns its closure for as long as it is registered. The host only
//! stores a bare function pointer (a trampoline), so nothing else keeps the
//! closure alive.

pub mod callbacks;
pub mod commands;
pub mod expr;

use std::collections::{HashMap, VecDeque};
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use callbacks::{CallbackRegistry, CallbackThunk};
pub use commands::{CommandRegistry, CommandThunk};
pub use expr::{ExprFunctionRegistry, ExprThunk, RawArgs, RawExprFn, WordsExprFn};

use crate::error::{BridgeError, BridgeResult};

/// Lock a registry table.
///
/// Poisoning is ignored: user closures never run under the lock, so a
/// poisoned table can only come from a panic in our own bookkeeping, which
/// leaves the table consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T>
{
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Validate a command or expression function name and convert it for the host.
pub(crate) fn host_name(name: &str) -> BridgeResult<CString>
{
    if name.is_empty() {
        return Err(BridgeError::NullName);
    }
    CString::new(name).map_err(|_| BridgeError::InvalidName { name: name.to_string() })
}

/// Name-keyed entries bound to fixed trampoline slots.
///
/// An entry is placed in its slot *before* the host learns about the
/// trampoline and only gets its name bound once the host accepted it.
///
/// Vacated slots are handed out again least-recently-freed first, so a late
/// host call through an unregistered trampoline finds its slot empty until
/// every other free slot has been used.
pub(crate) struct NamedSlots<E>
{
    by_name: HashMap<String, usize>,
    slots: Vec<Option<E>>,
    free: VecDeque<usize>,
}

impl<E> NamedSlots<E>
{
    pub(crate) fn new(capacity: usize) -> Self
    {
        Self {
            by_name: HashMap::new(),
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            free: (0..capacity).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize
    {
        self.slots.len()
    }

    pub(crate) fn contains(&self, name: &str) -> bool
    {
        self.by_name.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&E>
    {
        self.by_name.get(name).and_then(|&slot| self.slot(slot))
    }

    pub(crate) fn slot(&self, slot: usize) -> Option<&E>
    {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn free_slot(&self) -> Option<usize>
    {
        self.free.front().copied()
    }

    /// Occupy `slot` without binding a name.
    pub(crate) fn reserve(&mut self, slot: usize, entry: E)
    {
        self.free.retain(|&free| free != slot);
        self.slots[slot] = Some(entry);
    }

    /// Undo [`Self::reserve`]. The slot goes to the back of the free queue.
    pub(crate) fn vacate(&mut self, slot: usize) -> Option<E>
    {
        let entry = self.slots.get_mut(slot).and_then(Option::take)?;
        self.free.push_back(slot);
        Some(entry)
    }

    pub(crate) fn bind(&mut self, name: String, slot: usize)
    {
        self.by_name.insert(name, slot);
    }

    /// Unbind `name` and free its slot.
    pub(crate) fn remove(&mut self, name: &str) -> Option<(usize, E)>
    {
        let slot = self.by_name.remove(name)?;
        self.vacate(slot).map(|entry| (slot, entry))
    }

    pub(crate) fn names(&self) -> Vec<String>
    {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn len(&self) -> usize
    {
        self.by_name.len()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_host_name_validation()
    {
        assert!(matches!(host_name(""), Err(BridgeError::NullName)));
        assert!(matches!(host_name("bad\0name"), Err(BridgeError::InvalidName { .. })));
        assert_eq!(host_name("bp").unwrap().as_bytes(), b"bp");
    }

    #[test]
    fn test_named_slots_reserve_bind_remove()
    {
        let mut table = NamedSlots::new(2);
        assert_eq!(table.free_slot(), Some(0));

        table.reserve(0, "first");
        assert_eq!(table.free_slot(), Some(1));
        assert!(!table.contains("a"));

        table.bind("a".to_string(), 0);
        assert_eq!(table.get("a"), Some(&"first"));
        assert_eq!(table.len(), 1);

        table.reserve(1, "second");
        assert_eq!(table.free_slot(), None);
        assert_eq!(table.vacate(1), Some("second"));

        assert_eq!(table.remove("a"), Some((0, "first")));
        assert!(table.names().is_empty());
        assert_eq!(table.capacity(), 2);
    }

    #[test]
    fn test_vacated_slots_are_reused_last()
    {
        let mut table = NamedSlots::new(3);
        for (slot, name) in ["a", "b", "c"].into_iter().enumerate() {
            table.reserve(slot, name);
            table.bind(name.to_string(), slot);
        }

        assert_eq!(table.remove("a"), Some((0, "a")));
        assert_eq!(table.remove("c"), Some((2, "c")));
        assert_eq!(table.free_slot(), Some(0));

        table.reserve(0, "d");
        assert_eq!(table.free_slot(), Some(2));

        // A rejected reservation goes to the back of the queue
        table.reserve(2, "e");
        assert_eq!(table.vacate(2), Some("e"));
        assert_eq!(table.free_slot(), Some(2));
        assert_eq!(table.vacate(2), None);
    }
}

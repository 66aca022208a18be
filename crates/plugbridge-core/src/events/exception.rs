//! Exception records and their parent chain.

use std::fmt;
use std::marker::PhantomData;

use super::layout::{RawExceptionDebugInfo, RawExceptionRecord, EXCEPTION_MAXIMUM_PARAMETERS};
use crate::types::Address;

/// Upper bound on links followed by [`ExceptionRecord::chain`].
///
/// The host gives no guarantee that a chain is acyclic, so iteration stops
/// here even if more parents are linked.
pub const MAX_EXCEPTION_CHAIN_DEPTH: usize = 64;

/// `EXCEPTION_NONCONTINUABLE`
pub const EXCEPTION_NONCONTINUABLE: u32 = 0x1;

/// Decoded `EXCEPTION_RECORD`.
///
/// The inline parameters are copied at decode time, but only the first
/// `NumberParameters` (at most 15) of them; the remaining slots are zero even
/// if the host buffer held stale data. The parent link is *not* followed
/// until [`Self::parent`] is called, and is only valid for the current
/// dispatch (`'a`).
#[derive(Clone, Copy)]
pub struct ExceptionRecord<'a>
{
    code: u32,
    flags: u32,
    address: Address,
    number_parameters: u32,
    information: [usize; EXCEPTION_MAXIMUM_PARAMETERS],
    parent: *const RawExceptionRecord,
    _dispatch: PhantomData<&'a RawExceptionRecord>,
}

impl<'a> ExceptionRecord<'a>
{
    /// Copy a record out of host memory.
    ///
    /// # Safety
    ///
    /// `raw` must be a valid `EXCEPTION_RECORD` whose parent chain (if any)
    /// stays readable for `'a`.
    pub(crate) unsafe fn from_raw(raw: &RawExceptionRecord) -> Self
    {
        let count = Self::clamped(raw.number_parameters, EXCEPTION_MAXIMUM_PARAMETERS);
        let mut information = [0usize; EXCEPTION_MAXIMUM_PARAMETERS];
        information[..count].copy_from_slice(&raw.exception_information[..count]);

        Self {
            code: raw.exception_code,
            flags: raw.exception_flags,
            address: Address::new(raw.exception_address),
            number_parameters: raw.number_parameters,
            information,
            parent: raw.exception_record,
            _dispatch: PhantomData,
        }
    }

    fn clamped(number_parameters: u32, requested: usize) -> usize
    {
        let declared = usize::try_from(number_parameters).unwrap_or(usize::MAX);
        requested.min(EXCEPTION_MAXIMUM_PARAMETERS).min(declared)
    }

    /// `ExceptionCode` (e.g. `0xC0000005` for an access violation).
    #[must_use]
    pub fn code(&self) -> u32
    {
        self.code
    }

    /// `ExceptionFlags`
    #[must_use]
    pub fn flags(&self) -> u32
    {
        self.flags
    }

    /// Whether execution cannot continue after this exception.
    #[must_use]
    pub fn is_noncontinuable(&self) -> bool
    {
        self.flags & EXCEPTION_NONCONTINUABLE != 0
    }

    /// `ExceptionAddress`
    #[must_use]
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// `NumberParameters` exactly as the host reported it.
    #[must_use]
    pub fn number_parameters(&self) -> u32
    {
        self.number_parameters
    }

    /// Number of meaningful inline parameters: `min(NumberParameters, 15)`.
    #[must_use]
    pub fn parameter_count(&self) -> usize
    {
        Self::clamped(self.number_parameters, EXCEPTION_MAXIMUM_PARAMETERS)
    }

    /// Copy up to `dest.len()` parameters into `dest`.
    ///
    /// Reads `min(dest.len(), 15, NumberParameters)` values and leaves the
    /// rest of `dest` untouched. Returns the number of values written.
    pub fn fill_parameters(&self, dest: &mut [usize]) -> usize
    {
        let count = Self::clamped(self.number_parameters, dest.len());
        dest[..count].copy_from_slice(&self.information[..count]);
        count
    }

    /// `requested` parameter slots; slots past the meaningful count are `0`.
    #[must_use]
    pub fn parameters(&self, requested: usize) -> Vec<usize>
    {
        let mut values = vec![0usize; requested];
        self.fill_parameters(&mut values);
        values
    }

    /// Whether the host linked a parent (nested) exception record.
    #[must_use]
    pub fn has_parent(&self) -> bool
    {
        !self.parent.is_null()
    }

    /// Decode the parent record, one link only.
    #[must_use]
    pub fn parent(&self) -> Option<ExceptionRecord<'a>>
    {
        // SAFETY: the constructor's contract covers the whole chain for 'a.
        unsafe { self.parent.as_ref().map(|raw| ExceptionRecord::from_raw(raw)) }
    }

    /// Iterate this record and its ancestors, at most
    /// [`MAX_EXCEPTION_CHAIN_DEPTH`] records.
    #[must_use]
    pub fn chain(&self) -> ExceptionChain<'a>
    {
        ExceptionChain {
            next: Some(*self),
            remaining: MAX_EXCEPTION_CHAIN_DEPTH,
        }
    }
}

impl fmt::Debug for ExceptionRecord<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ExceptionRecord")
            .field("code", &format_args!("0x{:08x}", self.code))
            .field("flags", &self.flags)
            .field("address", &self.address)
            .field("parameters", &&self.information[..self.parameter_count()])
            .field("has_parent", &self.has_parent())
            .finish()
    }
}

/// Lazy walk over an exception chain.
pub struct ExceptionChain<'a>
{
    next: Option<ExceptionRecord<'a>>,
    remaining: usize,
}

impl<'a> Iterator for ExceptionChain<'a>
{
    type Item = ExceptionRecord<'a>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Decoded `EXCEPTION_DEBUG_INFO`.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionDebugInfo<'a>
{
    /// The exception itself
    pub record: ExceptionRecord<'a>,
    /// `dwFirstChance`: the debugger sees it before any handler ran
    pub first_chance: bool,
}

impl ExceptionDebugInfo<'_>
{
    /// # Safety
    ///
    /// See [`ExceptionRecord::from_raw`].
    pub(crate) unsafe fn from_raw(raw: &RawExceptionDebugInfo) -> Self
    {
        Self {
            record: ExceptionRecord::from_raw(&raw.exception_record),
            first_chance: raw.first_chance != 0,
        }
    }
}

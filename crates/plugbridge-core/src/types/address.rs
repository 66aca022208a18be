//! Debuggee address type.

use std::fmt;

/// Address inside the debugged process
///
/// The host reports addresses (exception addresses, module bases, thread
/// start routines) as pointer-width integers. They point into the *debuggee*,
/// not into this process, so they are never dereferenced here; the newtype
/// keeps them from being mixed up with handles, sizes, or local pointers.
///
/// ## Width
///
/// The width follows the host build: 64-bit on `x64dbg`, 32-bit on `x32dbg`.
///
/// ## Example
///
/// ```rust
/// use plugbridge_core::types::Address;
///
/// let base = Address::from(0x7ff6_0000_usize);
/// assert_eq!(base.value(), 0x7ff6_0000);
/// assert!(!base.is_null());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address
{
    /// The null address (0x0)
    pub const NULL: Self = Address(0);

    /// Create a new address from a pointer-width value
    pub const fn new(value: usize) -> Self
    {
        Address(value)
    }

    /// Get the raw value of this address
    pub const fn value(self) -> usize
    {
        self.0
    }

    /// Whether the host reported no address at all
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use plugbridge_core::types::Address;
    ///
    /// let addr = Address::from(0x1000_usize);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100_usize)));
    /// assert_eq!(addr.checked_add(usize::MAX), None);
    /// ```
    pub fn checked_add(self, offset: usize) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }
}

impl From<usize> for Address
{
    fn from(value: usize) -> Self
    {
        Address(value)
    }
}

impl From<Address> for usize
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let width = std::mem::size_of::<usize>() * 2;
        write!(f, "0x{:0width$x}", self.0)
    }
}

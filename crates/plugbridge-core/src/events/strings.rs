//! Copying host-owned strings into owned Rust `String`s.
//!
//! Every pointer the host passes in a payload is only valid until the
//! callback returns, so decoders copy eagerly. Scans are bounded by
//! [`MAX_STRING_UNITS`] so a missing terminator cannot run off into
//! unrelated memory indefinitely.

use libc::{c_char, c_void};

/// Upper bound on code units read from any host string.
pub const MAX_STRING_UNITS: usize = 0x8000;

/// Copy a NUL-terminated UTF-8 string.
///
/// Invalid UTF-8 is replaced with U+FFFD. Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to readable memory that contains a NUL within
/// [`MAX_STRING_UNITS`] bytes or is at least that long.
pub(crate) unsafe fn utf8_c_string(ptr: *const c_char) -> Option<String>
{
    if ptr.is_null() {
        return None;
    }
    let bytes = ptr.cast::<u8>();
    let len = terminated_len(bytes, MAX_STRING_UNITS);
    let slice = std::slice::from_raw_parts(bytes, len);
    Some(String::from_utf8_lossy(slice).into_owned())
}

/// Copy a NUL-terminated string whose encoding is chosen by the payload's
/// `fUnicode` flag: UTF-16 when set, UTF-8 otherwise.
///
/// # Safety
///
/// Same as [`utf8_c_string`], with the bound counted in code units.
pub(crate) unsafe fn flagged_c_string(ptr: *const c_void, unicode: bool) -> Option<String>
{
    if ptr.is_null() {
        return None;
    }
    if unicode {
        let units = ptr.cast::<u16>();
        let len = terminated_len(units, MAX_STRING_UNITS);
        Some(String::from_utf16_lossy(std::slice::from_raw_parts(units, len)))
    } else {
        utf8_c_string(ptr.cast())
    }
}

/// Copy a string with an explicit length in bytes.
///
/// With `unicode` set the byte count is halved into UTF-16 code units. The
/// text ends at the first NUL inside the counted range.
///
/// # Safety
///
/// `ptr` must be null or point to at least `min(len_bytes, 2 * MAX_STRING_UNITS)`
/// readable bytes.
pub(crate) unsafe fn flagged_counted_string(ptr: *const c_void, unicode: bool, len_bytes: usize) -> Option<String>
{
    if ptr.is_null() {
        return None;
    }
    let text = if unicode {
        let units = std::slice::from_raw_parts(ptr.cast::<u16>(), (len_bytes / 2).min(MAX_STRING_UNITS));
        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        String::from_utf16_lossy(&units[..end])
    } else {
        let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len_bytes.min(MAX_STRING_UNITS));
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    };
    Some(text)
}

unsafe fn terminated_len<T: Copy + Default + PartialEq>(ptr: *const T, max: usize) -> usize
{
    let zero = T::default();
    (0..max).find(|&i| ptr.add(i).read_unaligned() == zero).unwrap_or(max)
}

//! `#[repr(C)]` mirrors of the Win32 debug-event structures.
//!
//! These match `winnt.h` / `minwinbase.h` byte for byte. A mismatch would not
//! be detected at run time, so the sizes are pinned with compile-time
//! assertions for both pointer widths the host is built for.
//!
//! Handles (`HANDLE`) and debuggee addresses are pointer-width integers here:
//! they are opaque values in the debuggee's address space and are never
//! dereferenced by this process. Only the string pointers and the exception
//! chain pointer are read, and only by [`super::decoder`].

use std::mem::{align_of, size_of};

use libc::c_void;

/// `EXCEPTION_MAXIMUM_PARAMETERS`.
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

/// `EXCEPTION_RECORD`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawExceptionRecord
{
    pub exception_code: u32,
    pub exception_flags: u32,
    pub exception_record: *const RawExceptionRecord,
    pub exception_address: usize,
    pub number_parameters: u32,
    pub exception_information: [usize; EXCEPTION_MAXIMUM_PARAMETERS],
}

/// `EXCEPTION_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawExceptionDebugInfo
{
    pub exception_record: RawExceptionRecord,
    pub first_chance: u32,
}

/// `CREATE_THREAD_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCreateThreadDebugInfo
{
    pub h_thread: usize,
    pub thread_local_base: usize,
    pub start_address: usize,
}

/// `CREATE_PROCESS_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCreateProcessDebugInfo
{
    pub h_file: usize,
    pub h_process: usize,
    pub h_thread: usize,
    pub base_of_image: usize,
    pub debug_info_file_offset: u32,
    pub debug_info_size: u32,
    pub thread_local_base: usize,
    pub start_address: usize,
    pub image_name: *const c_void,
    pub unicode: u16,
}

/// `EXIT_THREAD_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawExitThreadDebugInfo
{
    pub exit_code: u32,
}

/// `EXIT_PROCESS_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawExitProcessDebugInfo
{
    pub exit_code: u32,
}

/// `LOAD_DLL_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawLoadDllDebugInfo
{
    pub h_file: usize,
    pub base_of_dll: usize,
    pub debug_info_file_offset: u32,
    pub debug_info_size: u32,
    pub image_name: *const c_void,
    pub unicode: u16,
}

/// `UNLOAD_DLL_DEBUG_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawUnloadDllDebugInfo
{
    pub base_of_dll: usize,
}

/// `OUTPUT_DEBUG_STRING_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawOutputDebugStringInfo
{
    pub debug_string_data: *const c_void,
    pub unicode: u16,
    /// Length in bytes, including the terminator.
    pub debug_string_length: u16,
}

/// `RIP_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawRipInfo
{
    pub error: u32,
    pub kind: u32,
}

/// The anonymous union inside `DEBUG_EVENT`: all nine payloads at offset 0.
///
/// Which member is live is decided by [`RawDebugEvent::debug_event_code`];
/// nothing outside [`super::decoder`] reads it.
#[repr(C)]
#[derive(Clone, Copy)]
pub union RawDebugEventUnion
{
    pub exception: RawExceptionDebugInfo,
    pub create_thread: RawCreateThreadDebugInfo,
    pub create_process: RawCreateProcessDebugInfo,
    pub exit_thread: RawExitThreadDebugInfo,
    pub exit_process: RawExitProcessDebugInfo,
    pub load_dll: RawLoadDllDebugInfo,
    pub unload_dll: RawUnloadDllDebugInfo,
    pub debug_string: RawOutputDebugStringInfo,
    pub rip_info: RawRipInfo,
}

/// `DEBUG_EVENT`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawDebugEvent
{
    pub debug_event_code: u32,
    pub process_id: u32,
    pub thread_id: u32,
    pub u: RawDebugEventUnion,
}

/// Size and alignment of one mirrored structure, for ABI inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutInfo
{
    /// C name of the structure
    pub name: &'static str,
    /// `sizeof`
    pub size: usize,
    /// `alignof`
    pub align: usize,
}

impl LayoutInfo
{
    /// Measure `T`.
    #[must_use]
    pub const fn of<T>(name: &'static str) -> Self
    {
        Self {
            name,
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }
}

/// Layouts of every debug-event structure this crate mirrors.
#[must_use]
pub fn debug_event_layouts() -> Vec<LayoutInfo>
{
    vec![
        LayoutInfo::of::<RawExceptionRecord>("EXCEPTION_RECORD"),
        LayoutInfo::of::<RawExceptionDebugInfo>("EXCEPTION_DEBUG_INFO"),
        LayoutInfo::of::<RawCreateThreadDebugInfo>("CREATE_THREAD_DEBUG_INFO"),
        LayoutInfo::of::<RawCreateProcessDebugInfo>("CREATE_PROCESS_DEBUG_INFO"),
        LayoutInfo::of::<RawExitThreadDebugInfo>("EXIT_THREAD_DEBUG_INFO"),
        LayoutInfo::of::<RawExitProcessDebugInfo>("EXIT_PROCESS_DEBUG_INFO"),
        LayoutInfo::of::<RawLoadDllDebugInfo>("LOAD_DLL_DEBUG_INFO"),
        LayoutInfo::of::<RawUnloadDllDebugInfo>("UNLOAD_DLL_DEBUG_INFO"),
        LayoutInfo::of::<RawOutputDebugStringInfo>("OUTPUT_DEBUG_STRING_INFO"),
        LayoutInfo::of::<RawRipInfo>("RIP_INFO"),
        LayoutInfo::of::<RawDebugEvent>("DEBUG_EVENT"),
    ]
}

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<RawExceptionRecord>() == 152);
    assert!(size_of::<RawExceptionDebugInfo>() == 160);
    assert!(size_of::<RawCreateProcessDebugInfo>() == 72);
    assert!(size_of::<RawLoadDllDebugInfo>() == 40);
    assert!(size_of::<RawOutputDebugStringInfo>() == 16);
    assert!(size_of::<RawDebugEvent>() == 176);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(size_of::<RawExceptionRecord>() == 80);
    assert!(size_of::<RawExceptionDebugInfo>() == 84);
    assert!(size_of::<RawCreateProcessDebugInfo>() == 40);
    assert!(size_of::<RawLoadDllDebugInfo>() == 24);
    assert!(size_of::<RawOutputDebugStringInfo>() == 8);
    assert!(size_of::<RawDebugEvent>() == 96);
};

//! Tagged-union decoding of `DEBUG_EVENT`.
//!
//! The union is only ever read through [`DebugEventPayload::decode`], which
//! branches on the event code first and then copies exactly the matching
//! member. Callers get an enum, so there is no way to look at an inactive
//! variant.

use std::fmt;
use std::ptr;

use super::exception::ExceptionDebugInfo;
use super::layout::{
    RawCreateProcessDebugInfo, RawCreateThreadDebugInfo, RawDebugEvent, RawDebugEventUnion, RawExitProcessDebugInfo,
    RawExitThreadDebugInfo, RawLoadDllDebugInfo, RawOutputDebugStringInfo, RawRipInfo, RawUnloadDllDebugInfo,
};
use super::strings::{flagged_c_string, flagged_counted_string};
use crate::error::{BridgeError, BridgeResult};
use crate::types::Address;

/// `dwDebugEventCode` values.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugEventCode
{
    /// `EXCEPTION_DEBUG_EVENT`
    Exception = 1,
    /// `CREATE_THREAD_DEBUG_EVENT`
    CreateThread = 2,
    /// `CREATE_PROCESS_DEBUG_EVENT`
    CreateProcess = 3,
    /// `EXIT_THREAD_DEBUG_EVENT`
    ExitThread = 4,
    /// `EXIT_PROCESS_DEBUG_EVENT`
    ExitProcess = 5,
    /// `LOAD_DLL_DEBUG_EVENT`
    LoadDll = 6,
    /// `UNLOAD_DLL_DEBUG_EVENT`
    UnloadDll = 7,
    /// `OUTPUT_DEBUG_STRING_EVENT`
    OutputDebugString = 8,
    /// `RIP_EVENT`
    Rip = 9,
}

impl DebugEventCode
{
    /// Every event code, in numeric order.
    pub const ALL: [DebugEventCode; 9] = [
        Self::Exception,
        Self::CreateThread,
        Self::CreateProcess,
        Self::ExitThread,
        Self::ExitProcess,
        Self::LoadDll,
        Self::UnloadDll,
        Self::OutputDebugString,
        Self::Rip,
    ];

    /// The raw `dwDebugEventCode`.
    #[must_use]
    pub const fn raw(self) -> u32
    {
        self as u32
    }

    /// The Win32 constant name.
    #[must_use]
    pub const fn c_name(self) -> &'static str
    {
        match self {
            Self::Exception => "EXCEPTION_DEBUG_EVENT",
            Self::CreateThread => "CREATE_THREAD_DEBUG_EVENT",
            Self::CreateProcess => "CREATE_PROCESS_DEBUG_EVENT",
            Self::ExitThread => "EXIT_THREAD_DEBUG_EVENT",
            Self::ExitProcess => "EXIT_PROCESS_DEBUG_EVENT",
            Self::LoadDll => "LOAD_DLL_DEBUG_EVENT",
            Self::UnloadDll => "UNLOAD_DLL_DEBUG_EVENT",
            Self::OutputDebugString => "OUTPUT_DEBUG_STRING_EVENT",
            Self::Rip => "RIP_EVENT",
        }
    }
}

impl TryFrom<u32> for DebugEventCode
{
    type Error = BridgeError;

    fn try_from(code: u32) -> Result<Self, Self::Error>
    {
        Self::ALL
            .iter()
            .copied()
            .find(|known| known.raw() == code)
            .ok_or(BridgeError::UnknownDebugEvent(code))
    }
}

/// Decoded `CREATE_THREAD_DEBUG_INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateThreadInfo
{
    /// Thread handle (debugger-side)
    pub thread_handle: usize,
    /// TEB address
    pub thread_local_base: Address,
    /// Thread start routine
    pub start_address: Address,
}

impl From<&RawCreateThreadDebugInfo> for CreateThreadInfo
{
    fn from(raw: &RawCreateThreadDebugInfo) -> Self
    {
        Self {
            thread_handle: raw.h_thread,
            thread_local_base: Address::new(raw.thread_local_base),
            start_address: Address::new(raw.start_address),
        }
    }
}

/// Decoded `CREATE_PROCESS_DEBUG_INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProcessInfo
{
    /// Image file handle
    pub file_handle: usize,
    /// Process handle
    pub process_handle: usize,
    /// Initial thread handle
    pub thread_handle: usize,
    /// Image base
    pub base_of_image: Address,
    /// Offset of debug info in the image file
    pub debug_info_file_offset: u32,
    /// Size of the debug info
    pub debug_info_size: u32,
    /// TEB of the initial thread
    pub thread_local_base: Address,
    /// Entry point of the initial thread
    pub start_address: Address,
    /// Image name, if the host provided one
    pub image_name: Option<String>,
    /// Whether the image name was UTF-16
    pub unicode: bool,
}

impl CreateProcessInfo
{
    /// # Safety
    ///
    /// `raw.image_name` must be null or a readable NUL-terminated string.
    pub(crate) unsafe fn from_raw(raw: &RawCreateProcessDebugInfo) -> Self
    {
        let unicode = raw.unicode != 0;
        Self {
            file_handle: raw.h_file,
            process_handle: raw.h_process,
            thread_handle: raw.h_thread,
            base_of_image: Address::new(raw.base_of_image),
            debug_info_file_offset: raw.debug_info_file_offset,
            debug_info_size: raw.debug_info_size,
            thread_local_base: Address::new(raw.thread_local_base),
            start_address: Address::new(raw.start_address),
            image_name: flagged_c_string(raw.image_name, unicode),
            unicode,
        }
    }
}

/// Decoded `EXIT_THREAD_DEBUG_INFO` / `EXIT_PROCESS_DEBUG_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo
{
    /// Exit code
    pub exit_code: u32,
}

impl From<&RawExitThreadDebugInfo> for ExitInfo
{
    fn from(raw: &RawExitThreadDebugInfo) -> Self
    {
        Self { exit_code: raw.exit_code }
    }
}

impl From<&RawExitProcessDebugInfo> for ExitInfo
{
    fn from(raw: &RawExitProcessDebugInfo) -> Self
    {
        Self { exit_code: raw.exit_code }
    }
}

/// Decoded `LOAD_DLL_DEBUG_INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDllInfo
{
    /// Module file handle
    pub file_handle: usize,
    /// Module base
    pub base_of_dll: Address,
    /// Offset of debug info in the module file
    pub debug_info_file_offset: u32,
    /// Size of the debug info
    pub debug_info_size: u32,
    /// Module path, if the host provided one
    pub image_name: Option<String>,
    /// Whether the image name was UTF-16
    pub unicode: bool,
}

impl LoadDllInfo
{
    /// # Safety
    ///
    /// `raw.image_name` must be null or a readable NUL-terminated string.
    pub(crate) unsafe fn from_raw(raw: &RawLoadDllDebugInfo) -> Self
    {
        let unicode = raw.unicode != 0;
        Self {
            file_handle: raw.h_file,
            base_of_dll: Address::new(raw.base_of_dll),
            debug_info_file_offset: raw.debug_info_file_offset,
            debug_info_size: raw.debug_info_size,
            image_name: flagged_c_string(raw.image_name, unicode),
            unicode,
        }
    }
}

/// Decoded `UNLOAD_DLL_DEBUG_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnloadDllInfo
{
    /// Base of the unloaded module
    pub base_of_dll: Address,
}

impl From<&RawUnloadDllDebugInfo> for UnloadDllInfo
{
    fn from(raw: &RawUnloadDllDebugInfo) -> Self
    {
        Self {
            base_of_dll: Address::new(raw.base_of_dll),
        }
    }
}

/// Decoded `OUTPUT_DEBUG_STRING_INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDebugStringInfo
{
    /// The message, up to its first terminator
    pub text: Option<String>,
    /// Whether the message was UTF-16
    pub unicode: bool,
}

impl OutputDebugStringInfo
{
    /// # Safety
    ///
    /// `raw.debug_string_data` must be null or point to
    /// `debug_string_length` readable bytes.
    pub(crate) unsafe fn from_raw(raw: &RawOutputDebugStringInfo) -> Self
    {
        let unicode = raw.unicode != 0;
        Self {
            text: flagged_counted_string(raw.debug_string_data, unicode, usize::from(raw.debug_string_length)),
            unicode,
        }
    }
}

/// Decoded `RIP_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RipInfo
{
    /// Error that caused the RIP
    pub error: u32,
    /// `SLE_ERROR`, `SLE_MINORERROR`, `SLE_WARNING`, or 0
    pub kind: u32,
}

impl From<&RawRipInfo> for RipInfo
{
    fn from(raw: &RawRipInfo) -> Self
    {
        Self {
            error: raw.error,
            kind: raw.kind,
        }
    }
}

/// The one live member of the `DEBUG_EVENT` union.
#[derive(Debug, Clone)]
pub enum DebugEventPayload<'a>
{
    /// `EXCEPTION_DEBUG_EVENT`
    Exception(ExceptionDebugInfo<'a>),
    /// `CREATE_THREAD_DEBUG_EVENT`
    CreateThread(CreateThreadInfo),
    /// `CREATE_PROCESS_DEBUG_EVENT`
    CreateProcess(CreateProcessInfo),
    /// `EXIT_THREAD_DEBUG_EVENT`
    ExitThread(ExitInfo),
    /// `EXIT_PROCESS_DEBUG_EVENT`
    ExitProcess(ExitInfo),
    /// `LOAD_DLL_DEBUG_EVENT`
    LoadDll(LoadDllInfo),
    /// `UNLOAD_DLL_DEBUG_EVENT`
    UnloadDll(UnloadDllInfo),
    /// `OUTPUT_DEBUG_STRING_EVENT`
    OutputDebugString(OutputDebugStringInfo),
    /// `RIP_EVENT`
    Rip(RipInfo),
}

impl<'a> DebugEventPayload<'a>
{
    /// Decode the union member selected by `code`.
    ///
    /// The discriminant is validated before any payload byte is read.
    ///
    /// ## Errors
    ///
    /// - `UnknownDebugEvent`: `code` is not one of the nine event codes
    /// - `NullPayload`: `payload` is null
    ///
    /// # Safety
    ///
    /// `payload` must point to a `DEBUG_EVENT` union whose member for `code`
    /// is initialised, and every pointer inside that member must stay valid
    /// for `'a` (string pointers are copied before this returns).
    pub unsafe fn decode(code: u32, payload: *const RawDebugEventUnion) -> BridgeResult<Self>
    {
        let code = DebugEventCode::try_from(code)?;
        if payload.is_null() {
            return Err(BridgeError::NullPayload("DEBUG_EVENT union"));
        }

        let decoded = match code {
            DebugEventCode::Exception => {
                let raw = ptr::addr_of!((*payload).exception).read_unaligned();
                Self::Exception(ExceptionDebugInfo::from_raw(&raw))
            }
            DebugEventCode::CreateThread => {
                let raw = ptr::addr_of!((*payload).create_thread).read_unaligned();
                Self::CreateThread(CreateThreadInfo::from(&raw))
            }
            DebugEventCode::CreateProcess => {
                let raw = ptr::addr_of!((*payload).create_process).read_unaligned();
                Self::CreateProcess(CreateProcessInfo::from_raw(&raw))
            }
            DebugEventCode::ExitThread => {
                let raw = ptr::addr_of!((*payload).exit_thread).read_unaligned();
                Self::ExitThread(ExitInfo::from(&raw))
            }
            DebugEventCode::ExitProcess => {
                let raw = ptr::addr_of!((*payload).exit_process).read_unaligned();
                Self::ExitProcess(ExitInfo::from(&raw))
            }
            DebugEventCode::LoadDll => {
                let raw = ptr::addr_of!((*payload).load_dll).read_unaligned();
                Self::LoadDll(LoadDllInfo::from_raw(&raw))
            }
            DebugEventCode::UnloadDll => {
                let raw = ptr::addr_of!((*payload).unload_dll).read_unaligned();
                Self::UnloadDll(UnloadDllInfo::from(&raw))
            }
            DebugEventCode::OutputDebugString => {
                let raw = ptr::addr_of!((*payload).debug_string).read_unaligned();
                Self::OutputDebugString(OutputDebugStringInfo::from_raw(&raw))
            }
            DebugEventCode::Rip => {
                let raw = ptr::addr_of!((*payload).rip_info).read_unaligned();
                Self::Rip(RipInfo::from(&raw))
            }
        };
        Ok(decoded)
    }

    /// The event code this payload was decoded for.
    #[must_use]
    pub fn code(&self) -> DebugEventCode
    {
        match self {
            Self::Exception(_) => DebugEventCode::Exception,
            Self::CreateThread(_) => DebugEventCode::CreateThread,
            Self::CreateProcess(_) => DebugEventCode::CreateProcess,
            Self::ExitThread(_) => DebugEventCode::ExitThread,
            Self::ExitProcess(_) => DebugEventCode::ExitProcess,
            Self::LoadDll(_) => DebugEventCode::LoadDll,
            Self::UnloadDll(_) => DebugEventCode::UnloadDll,
            Self::OutputDebugString(_) => DebugEventCode::OutputDebugString,
            Self::Rip(_) => DebugEventCode::Rip,
        }
    }
}

/// Decoded `DEBUG_EVENT`.
#[derive(Debug, Clone)]
pub struct DebugEvent<'a>
{
    /// `dwProcessId`
    pub process_id: u32,
    /// `dwThreadId`
    pub thread_id: u32,
    /// The live union member
    pub payload: DebugEventPayload<'a>,
}

impl<'a> DebugEvent<'a>
{
    /// Decode a whole `DEBUG_EVENT` from host memory.
    ///
    /// ## Errors
    ///
    /// - `NullPayload`: `event` is null
    /// - `UnknownDebugEvent`: the discriminant is not a known event code
    ///
    /// # Safety
    ///
    /// `event` must be null or point to a valid `DEBUG_EVENT`; see
    /// [`DebugEventPayload::decode`].
    pub unsafe fn from_raw(event: *const RawDebugEvent) -> BridgeResult<Self>
    {
        if event.is_null() {
            return Err(BridgeError::NullPayload("DEBUG_EVENT"));
        }
        let code = ptr::addr_of!((*event).debug_event_code).read_unaligned();
        let process_id = ptr::addr_of!((*event).process_id).read_unaligned();
        let thread_id = ptr::addr_of!((*event).thread_id).read_unaligned();
        let payload = DebugEventPayload::decode(code, ptr::addr_of!((*event).u))?;

        Ok(Self {
            process_id,
            thread_id,
            payload,
        })
    }

    /// The event code.
    #[must_use]
    pub fn code(&self) -> DebugEventCode
    {
        self.payload.code()
    }
}

impl fmt::Display for DebugEventCode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.c_name())
    }
}

//! # Callback Payloads
//!
//! The `info` pointer of a `CBPLUGIN` call points at a different
//! `PLUG_CB_*` structure for every callback type. [`CallbackInfo`] pairs the
//! pointer with the type it was delivered for and only lets the matching
//! accessor read it.
//!
//! ```rust,no_run
//! use plugbridge_core::error::CallbackResult;
//! use plugbridge_core::payload::CallbackInfo;
//!
//! fn on_load_dll(info: &CallbackInfo<'_>) -> CallbackResult<()>
//! {
//!     let load = info.load_dll()?;
//!     tracing::info!(module = ?load.module_name, base = %load.info.base_of_dll, "module loaded");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use libc::{c_char, c_int, c_void};

use crate::error::{BridgeError, BridgeResult};
use crate::events::decoder::{
    CreateProcessInfo, CreateThreadInfo, DebugEvent, ExitInfo, LoadDllInfo, OutputDebugStringInfo, UnloadDllInfo,
};
use crate::events::exception::ExceptionDebugInfo;
use crate::events::layout::{
    LayoutInfo, RawCreateProcessDebugInfo, RawCreateThreadDebugInfo, RawDebugEvent, RawExceptionDebugInfo, RawExitProcessDebugInfo,
    RawExitThreadDebugInfo, RawLoadDllDebugInfo, RawOutputDebugStringInfo, RawUnloadDllDebugInfo,
};
use crate::events::strings::utf8_c_string;
use crate::types::{Address, CallbackType, MenuEntryId, PlugInitStruct, PlugSetupStruct};

/// `PLUG_CB_INITDEBUG`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbInitDebug
{
    pub file_name: *const c_char,
}

/// `PLUG_CB_STOPDEBUG`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbStopDebug
{
    pub reserved: *mut c_void,
}

/// `PLUG_CB_CREATEPROCESS`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbCreateProcess
{
    pub create_process_info: *const RawCreateProcessDebugInfo,
    /// `IMAGEHLP_MODULE64*`, not decoded
    pub mod_info: *const c_void,
    pub debug_file_name: *const c_char,
    /// `PROCESS_INFORMATION*`, not decoded
    pub process_info: *const c_void,
}

/// `PLUG_CB_EXITPROCESS`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbExitProcess
{
    pub exit_process: *const RawExitProcessDebugInfo,
}

/// `PLUG_CB_CREATETHREAD`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbCreateThread
{
    pub create_thread: *const RawCreateThreadDebugInfo,
    pub thread_id: u32,
}

/// `PLUG_CB_EXITTHREAD`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbExitThread
{
    pub exit_thread: *const RawExitThreadDebugInfo,
    pub thread_id: u32,
}

/// `PLUG_CB_LOADDLL`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbLoadDll
{
    pub load_dll: *const RawLoadDllDebugInfo,
    /// `IMAGEHLP_MODULE64*`, not decoded
    pub mod_info: *const c_void,
    pub mod_name: *const c_char,
}

/// `PLUG_CB_UNLOADDLL`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbUnloadDll
{
    pub unload_dll: *const RawUnloadDllDebugInfo,
}

/// `PLUG_CB_OUTPUTDEBUGSTRING`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbOutputDebugString
{
    pub debug_string: *const RawOutputDebugStringInfo,
}

/// `PLUG_CB_EXCEPTION`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbException
{
    pub exception: *const RawExceptionDebugInfo,
}

/// `PLUG_CB_DEBUGEVENT`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbDebugEvent
{
    pub debug_event: *const RawDebugEvent,
}

/// `PLUG_CB_MENUENTRY`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbMenuEntry
{
    pub h_entry: c_int,
}

/// `PLUG_CB_TRACEEXECUTE`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugCbTraceExecute
{
    pub cip: usize,
    pub stop: bool,
}

/// Layouts of every callback payload and plugin structure this crate mirrors.
#[must_use]
pub fn callback_payload_layouts() -> Vec<LayoutInfo>
{
    vec![
        LayoutInfo::of::<PlugInitStruct>("PLUG_INITSTRUCT"),
        LayoutInfo::of::<PlugSetupStruct>("PLUG_SETUPSTRUCT"),
        LayoutInfo::of::<PlugCbInitDebug>("PLUG_CB_INITDEBUG"),
        LayoutInfo::of::<PlugCbStopDebug>("PLUG_CB_STOPDEBUG"),
        LayoutInfo::of::<PlugCbCreateProcess>("PLUG_CB_CREATEPROCESS"),
        LayoutInfo::of::<PlugCbExitProcess>("PLUG_CB_EXITPROCESS"),
        LayoutInfo::of::<PlugCbCreateThread>("PLUG_CB_CREATETHREAD"),
        LayoutInfo::of::<PlugCbExitThread>("PLUG_CB_EXITTHREAD"),
        LayoutInfo::of::<PlugCbLoadDll>("PLUG_CB_LOADDLL"),
        LayoutInfo::of::<PlugCbUnloadDll>("PLUG_CB_UNLOADDLL"),
        LayoutInfo::of::<PlugCbOutputDebugString>("PLUG_CB_OUTPUTDEBUGSTRING"),
        LayoutInfo::of::<PlugCbException>("PLUG_CB_EXCEPTION"),
        LayoutInfo::of::<PlugCbDebugEvent>("PLUG_CB_DEBUGEVENT"),
        LayoutInfo::of::<PlugCbMenuEntry>("PLUG_CB_MENUENTRY"),
        LayoutInfo::of::<PlugCbTraceExecute>("PLUG_CB_TRACEEXECUTE"),
    ]
}

/// Whether [`CallbackInfo`] has a decoding accessor for `kind`.
#[must_use]
pub const fn is_decoded(kind: CallbackType) -> bool
{
    matches!(
        kind,
        CallbackType::InitDebug
            | CallbackType::StopDebug
            | CallbackType::CreateProcess
            | CallbackType::ExitProcess
            | CallbackType::CreateThread
            | CallbackType::ExitThread
            | CallbackType::LoadDll
            | CallbackType::UnloadDll
            | CallbackType::OutputDebugString
            | CallbackType::Exception
            | CallbackType::DebugEvent
            | CallbackType::MenuEntry
            | CallbackType::TraceExecute
    )
}

/// `CB_INITDEBUG` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitDebug
{
    /// Executable being debugged
    pub file_name: Option<String>,
}

/// `CB_CREATEPROCESS` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProcess
{
    /// Decoded `CREATE_PROCESS_DEBUG_INFO`, if provided
    pub info: Option<CreateProcessInfo>,
    /// File the host loaded debug symbols from
    pub debug_file_name: Option<String>,
}

/// `CB_CREATETHREAD` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateThread
{
    /// Decoded `CREATE_THREAD_DEBUG_INFO`, if provided
    pub info: Option<CreateThreadInfo>,
    /// Thread id
    pub thread_id: u32,
}

/// `CB_EXITTHREAD` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitThread
{
    /// Decoded `EXIT_THREAD_DEBUG_INFO`, if provided
    pub info: Option<ExitInfo>,
    /// Thread id
    pub thread_id: u32,
}

/// `CB_LOADDLL` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDll
{
    /// Decoded `LOAD_DLL_DEBUG_INFO`
    pub info: LoadDllInfo,
    /// Module name as the host's symbol engine knows it
    pub module_name: Option<String>,
}

/// Live `CB_TRACEEXECUTE` payload; the host reads `stop` back after the
/// callback returns.
pub struct TraceExecute<'a>
{
    raw: *mut PlugCbTraceExecute,
    _dispatch: PhantomData<&'a mut PlugCbTraceExecute>,
}

impl TraceExecute<'_>
{
    /// Current instruction pointer.
    #[must_use]
    pub fn cip(&self) -> Address
    {
        // SAFETY: non-null and valid for the dispatch, checked on construction.
        Address::new(unsafe { ptr::addr_of!((*self.raw).cip).read_unaligned() })
    }

    /// Whether the trace is currently set to stop.
    #[must_use]
    pub fn stop(&self) -> bool
    {
        unsafe { ptr::addr_of!((*self.raw).stop).read_unaligned() }
    }

    /// Ask the host to stop (or keep) tracing after this step.
    pub fn set_stop(&self, stop: bool)
    {
        unsafe { ptr::addr_of_mut!((*self.raw).stop).write_unaligned(stop) }
    }
}

/// Payload of a single callback dispatch.
///
/// Valid only for the duration of the callback (`'a`). All accessors fail
/// with `PayloadMismatch` when used for another callback type and with
/// `NullPayload` when the host passed no payload.
pub struct CallbackInfo<'a>
{
    kind: CallbackType,
    raw: *mut c_void,
    _dispatch: PhantomData<&'a mut c_void>,
}

impl<'a> CallbackInfo<'a>
{
    /// Wrap the arguments of a `CBPLUGIN` call.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to the `PLUG_CB_*` structure the host
    /// defines for `kind`, and everything it references must stay valid
    /// for `'a`.
    #[must_use]
    pub unsafe fn from_raw(kind: CallbackType, raw: *mut c_void) -> Self
    {
        Self {
            kind,
            raw,
            _dispatch: PhantomData,
        }
    }

    /// Callback type of this dispatch.
    #[must_use]
    pub fn kind(&self) -> CallbackType
    {
        self.kind
    }

    /// The undecoded payload pointer, for callback types without an accessor.
    #[must_use]
    pub fn raw(&self) -> *mut c_void
    {
        self.raw
    }

    fn payload<T>(&self, expected: CallbackType) -> BridgeResult<*mut T>
    {
        if self.kind != expected {
            return Err(BridgeError::PayloadMismatch {
                expected,
                actual: self.kind,
            });
        }
        if self.raw.is_null() {
            return Err(BridgeError::NullPayload(expected.c_name()));
        }
        Ok(self.raw.cast())
    }

    fn read<T: Copy>(&self, expected: CallbackType) -> BridgeResult<T>
    {
        let ptr = self.payload::<T>(expected)?;
        // SAFETY: type checked above, validity is the constructor's contract.
        Ok(unsafe { ptr.read_unaligned() })
    }

    /// `CB_INITDEBUG`
    pub fn init_debug(&self) -> BridgeResult<InitDebug>
    {
        let raw: PlugCbInitDebug = self.read(CallbackType::InitDebug)?;
        Ok(InitDebug {
            file_name: unsafe { utf8_c_string(raw.file_name) },
        })
    }

    /// `CB_STOPDEBUG` (no data; validates the dispatch type).
    pub fn stop_debug(&self) -> BridgeResult<()>
    {
        if self.kind == CallbackType::StopDebug {
            Ok(())
        } else {
            Err(BridgeError::PayloadMismatch {
                expected: CallbackType::StopDebug,
                actual: self.kind,
            })
        }
    }

    /// `CB_CREATEPROCESS`
    pub fn create_process(&self) -> BridgeResult<CreateProcess>
    {
        let raw: PlugCbCreateProcess = self.read(CallbackType::CreateProcess)?;
        unsafe {
            Ok(CreateProcess {
                info: raw.create_process_info.as_ref().map(|info| CreateProcessInfo::from_raw(info)),
                debug_file_name: utf8_c_string(raw.debug_file_name),
            })
        }
    }

    /// `CB_EXITPROCESS`
    pub fn exit_process(&self) -> BridgeResult<ExitInfo>
    {
        let raw: PlugCbExitProcess = self.read(CallbackType::ExitProcess)?;
        unsafe { raw.exit_process.as_ref() }
            .map(ExitInfo::from)
            .ok_or(BridgeError::NullPayload("EXIT_PROCESS_DEBUG_INFO"))
    }

    /// `CB_CREATETHREAD`
    pub fn create_thread(&self) -> BridgeResult<CreateThread>
    {
        let raw: PlugCbCreateThread = self.read(CallbackType::CreateThread)?;
        Ok(CreateThread {
            info: unsafe { raw.create_thread.as_ref() }.map(CreateThreadInfo::from),
            thread_id: raw.thread_id,
        })
    }

    /// `CB_EXITTHREAD`
    pub fn exit_thread(&self) -> BridgeResult<ExitThread>
    {
        let raw: PlugCbExitThread = self.read(CallbackType::ExitThread)?;
        Ok(ExitThread {
            info: unsafe { raw.exit_thread.as_ref() }.map(ExitInfo::from),
            thread_id: raw.thread_id,
        })
    }

    /// `CB_LOADDLL`
    pub fn load_dll(&self) -> BridgeResult<LoadDll>
    {
        let raw: PlugCbLoadDll = self.read(CallbackType::LoadDll)?;
        unsafe {
            let info = raw
                .load_dll
                .as_ref()
                .map(|info| LoadDllInfo::from_raw(info))
                .ok_or(BridgeError::NullPayload("LOAD_DLL_DEBUG_INFO"))?;
            Ok(LoadDll {
                info,
                module_name: utf8_c_string(raw.mod_name),
            })
        }
    }

    /// `CB_UNLOADDLL`
    pub fn unload_dll(&self) -> BridgeResult<UnloadDllInfo>
    {
        let raw: PlugCbUnloadDll = self.read(CallbackType::UnloadDll)?;
        unsafe { raw.unload_dll.as_ref() }
            .map(UnloadDllInfo::from)
            .ok_or(BridgeError::NullPayload("UNLOAD_DLL_DEBUG_INFO"))
    }

    /// `CB_OUTPUTDEBUGSTRING`
    pub fn output_debug_string(&self) -> BridgeResult<OutputDebugStringInfo>
    {
        let raw: PlugCbOutputDebugString = self.read(CallbackType::OutputDebugString)?;
        unsafe {
            raw.debug_string
                .as_ref()
                .map(|info| OutputDebugStringInfo::from_raw(info))
                .ok_or(BridgeError::NullPayload("OUTPUT_DEBUG_STRING_INFO"))
        }
    }

    /// `CB_EXCEPTION`
    pub fn exception(&self) -> BridgeResult<ExceptionDebugInfo<'a>>
    {
        let raw: PlugCbException = self.read(CallbackType::Exception)?;
        unsafe {
            raw.exception
                .as_ref()
                .map(|info| ExceptionDebugInfo::from_raw(info))
                .ok_or(BridgeError::NullPayload("EXCEPTION_DEBUG_INFO"))
        }
    }

    /// `CB_DEBUGEVENT`
    pub fn debug_event(&self) -> BridgeResult<DebugEvent<'a>>
    {
        let raw: PlugCbDebugEvent = self.read(CallbackType::DebugEvent)?;
        unsafe { DebugEvent::from_raw(raw.debug_event) }
    }

    /// `CB_MENUENTRY`
    pub fn menu_entry(&self) -> BridgeResult<MenuEntryId>
    {
        let raw: PlugCbMenuEntry = self.read(CallbackType::MenuEntry)?;
        Ok(MenuEntryId(raw.h_entry))
    }

    /// `CB_TRACEEXECUTE`
    pub fn trace_execute(&self) -> BridgeResult<TraceExecute<'a>>
    {
        let raw = self.payload::<PlugCbTraceExecute>(CallbackType::TraceExecute)?;
        Ok(TraceExecute {
            raw,
            _dispatch: PhantomData,
        })
    }
}

impl fmt::Debug for CallbackInfo<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CallbackInfo")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .finish()
    }
}

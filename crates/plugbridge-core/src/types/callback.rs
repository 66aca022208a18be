//! Callback type codes (`CBTYPE`).

use std::fmt;

use libc::c_int;

use crate::error::{BridgeError, BridgeResult};

/// Event kinds the host can deliver to a plugin callback.
///
/// The discriminants are the host's `CBTYPE` values and must never be
/// reordered: the host passes them as plain `int`s.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackType
{
    /// Debugging session is starting (`PLUG_CB_INITDEBUG`).
    InitDebug = 0,
    /// Debugging session ended (`PLUG_CB_STOPDEBUG`).
    StopDebug = 1,
    /// Debuggee process created (`PLUG_CB_CREATEPROCESS`).
    CreateProcess = 2,
    /// Debuggee process exited (`PLUG_CB_EXITPROCESS`).
    ExitProcess = 3,
    /// Thread created (`PLUG_CB_CREATETHREAD`).
    CreateThread = 4,
    /// Thread exited (`PLUG_CB_EXITTHREAD`).
    ExitThread = 5,
    /// System breakpoint reached.
    SystemBreakpoint = 6,
    /// Module loaded (`PLUG_CB_LOADDLL`).
    LoadDll = 7,
    /// Module unloaded (`PLUG_CB_UNLOADDLL`).
    UnloadDll = 8,
    /// `OutputDebugString` called by the debuggee.
    OutputDebugString = 9,
    /// Exception raised in the debuggee (`PLUG_CB_EXCEPTION`).
    Exception = 10,
    /// Breakpoint hit.
    Breakpoint = 11,
    /// Debuggee paused.
    PauseDebug = 12,
    /// Debuggee resumed.
    ResumeDebug = 13,
    /// Single step completed.
    Stepped = 14,
    /// Before attaching, after `InitDebug`.
    Attach = 15,
    /// Before detaching, before `StopDebug`.
    Detach = 16,
    /// Any raw debug event (`PLUG_CB_DEBUGEVENT`).
    DebugEvent = 17,
    /// Plugin menu entry clicked (`PLUG_CB_MENUENTRY`).
    MenuEntry = 18,
    /// Window message for the host's main window.
    WinEvent = 19,
    /// Window message seen by the host's global filter.
    WinEventGlobal = 20,
    /// Database loaded.
    LoadDb = 21,
    /// Database about to be saved.
    SaveDb = 22,
    /// Symbol filter query.
    FilterSymbol = 23,
    /// Trace step (`PLUG_CB_TRACEEXECUTE`).
    TraceExecute = 24,
    /// Selection changed in a view.
    SelChanged = 25,
    /// Analysis requested.
    Analyze = 26,
    /// Address info query.
    AddrInfo = 27,
    /// Value-from-string conversion.
    ValFromString = 28,
    /// Value-to-string conversion.
    ValToString = 29,
    /// Context menu about to be shown.
    MenuPrepare = 30,
    /// Debugging session is stopping.
    StoppingDebug = 31,
}

impl CallbackType
{
    /// Number of callback slots (`CB_LAST`).
    pub const COUNT: usize = 32;

    /// Every callback type, in code order.
    pub const ALL: [CallbackType; Self::COUNT] = [
        Self::InitDebug,
        Self::StopDebug,
        Self::CreateProcess,
        Self::ExitProcess,
        Self::CreateThread,
        Self::ExitThread,
        Self::SystemBreakpoint,
        Self::LoadDll,
        Self::UnloadDll,
        Self::OutputDebugString,
        Self::Exception,
        Self::Breakpoint,
        Self::PauseDebug,
        Self::ResumeDebug,
        Self::Stepped,
        Self::Attach,
        Self::Detach,
        Self::DebugEvent,
        Self::MenuEntry,
        Self::WinEvent,
        Self::WinEventGlobal,
        Self::LoadDb,
        Self::SaveDb,
        Self::FilterSymbol,
        Self::TraceExecute,
        Self::SelChanged,
        Self::Analyze,
        Self::AddrInfo,
        Self::ValFromString,
        Self::ValToString,
        Self::MenuPrepare,
        Self::StoppingDebug,
    ];

    /// Validate a raw code received from (or destined for) the host.
    ///
    /// ## Errors
    ///
    /// - `InvalidEventType`: `code` is outside `[0, COUNT)`
    pub fn from_raw(code: c_int) -> BridgeResult<Self>
    {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(BridgeError::InvalidEventType(code))
    }

    /// The raw `CBTYPE` value.
    #[must_use]
    pub const fn raw(self) -> c_int
    {
        self as c_int
    }

    /// Slot index in the callback table.
    #[must_use]
    pub const fn index(self) -> usize
    {
        self as usize
    }

    /// The host's C name for this code (`CB_*`).
    #[must_use]
    pub const fn c_name(self) -> &'static str
    {
        match self {
            Self::InitDebug => "CB_INITDEBUG",
            Self::StopDebug => "CB_STOPDEBUG",
            Self::CreateProcess => "CB_CREATEPROCESS",
            Self::ExitProcess => "CB_EXITPROCESS",
            Self::CreateThread => "CB_CREATETHREAD",
            Self::ExitThread => "CB_EXITTHREAD",
            Self::SystemBreakpoint => "CB_SYSTEMBREAKPOINT",
            Self::LoadDll => "CB_LOADDLL",
            Self::UnloadDll => "CB_UNLOADDLL",
            Self::OutputDebugString => "CB_OUTPUTDEBUGSTRING",
            Self::Exception => "CB_EXCEPTION",
            Self::Breakpoint => "CB_BREAKPOINT",
            Self::PauseDebug => "CB_PAUSEDEBUG",
            Self::ResumeDebug => "CB_RESUMEDEBUG",
            Self::Stepped => "CB_STEPPED",
            Self::Attach => "CB_ATTACH",
            Self::Detach => "CB_DETACH",
            Self::DebugEvent => "CB_DEBUGEVENT",
            Self::MenuEntry => "CB_MENUENTRY",
            Self::WinEvent => "CB_WINEVENT",
            Self::WinEventGlobal => "CB_WINEVENTGLOBAL",
            Self::LoadDb => "CB_LOADDB",
            Self::SaveDb => "CB_SAVEDB",
            Self::FilterSymbol => "CB_FILTERSYMBOL",
            Self::TraceExecute => "CB_TRACEEXECUTE",
            Self::SelChanged => "CB_SELCHANGED",
            Self::Analyze => "CB_ANALYZE",
            Self::AddrInfo => "CB_ADDRINFO",
            Self::ValFromString => "CB_VALFROMSTRING",
            Self::ValToString => "CB_VALTOSTRING",
            Self::MenuPrepare => "CB_MENUPREPARE",
            Self::StoppingDebug => "CB_STOPPINGDEBUG",
        }
    }
}

impl From<CallbackType> for i32
{
    fn from(kind: CallbackType) -> Self
    {
        kind.raw()
    }
}

impl TryFrom<i32> for CallbackType
{
    type Error = BridgeError;

    fn try_from(code: i32) -> Result<Self, Self::Error>
    {
        Self::from_raw(code)
    }
}

impl fmt::Display for CallbackType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.c_name())
    }
}


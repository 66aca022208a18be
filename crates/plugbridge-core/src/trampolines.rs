//! Native entry points handed to the host.
//!
//! The host stores bare `extern "C"` function pointers and nothing else, so
//! the only way back to the right closure is through the installed
//! [`Bridge`]. Event callbacks share one entry point (the event code is an
//! argument). Commands and expression functions get one monomorphised entry
//! point per registry slot, since their signatures carry no identifying
//! argument.
//!
//! Every entry point runs under [`contain`] and never unwinds.

use libc::{c_char, c_int, c_void};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::guard::{contain, TracingFaultSink};
use crate::host::{CommandFn, ExprFunctionFn};

/// Trampolines per name-keyed registry.
pub const TRAMPOLINE_SLOTS: usize = 64;

macro_rules! slot_table {
    ($entry:ident; $($slot:literal)*) => {
        [$($entry::<$slot>),*]
    };
}

pub(crate) static COMMAND_TRAMPOLINES: [CommandFn; TRAMPOLINE_SLOTS] = slot_table!(command_slot;
    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
    32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63);

pub(crate) static EXPR_TRAMPOLINES: [ExprFunctionFn; TRAMPOLINE_SLOTS] = slot_table!(expr_slot;
    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
    32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63);

fn enter<T, F>(site: &'static str, op: F) -> T
where
    T: Default,
    F: FnOnce(&'static Bridge) -> BridgeResult<T>,
{
    match Bridge::installed() {
        Some(bridge) => contain(site, bridge.fault_sink(), || op(bridge)),
        None => contain(site, &TracingFaultSink, || Err(BridgeError::NotInstalled)),
    }
}

/// `CBPLUGIN` entry point shared by every callback type.
pub(crate) unsafe extern "C" fn callback_trampoline(cb_type: c_int, info: *mut c_void)
{
    enter("callback", |bridge| unsafe { bridge.callbacks().dispatch_raw(cb_type, info) }.map(drop));
}

unsafe extern "C" fn command_slot<const SLOT: usize>(argc: c_int, argv: *mut *mut c_char) -> bool
{
    enter("command", |bridge| unsafe { bridge.commands().dispatch_slot(SLOT, argc, argv) })
}

unsafe extern "C" fn expr_slot<const SLOT: usize>(argc: c_int, argv: *const usize, userdata: *mut c_void) -> usize
{
    enter("expression function", |bridge| unsafe {
        bridge.expr_functions().dispatch_slot(SLOT, argc, argv, userdata as usize)
    })
}

//! Shared test doubles: a recording host and a recording fault sink.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use libc::c_int;
use plugbridge_core::guard::{Fault, FaultSink};
use plugbridge_core::host::{CallbackFn, CommandFn, ExprFunctionFn, Host};
use plugbridge_core::{Bridge, CallbackType, MenuEntryId, MenuHandle, PluginHandle};

pub const PLUGIN: PluginHandle = PluginHandle(7);

/// Host call recorded by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall
{
    LogPrint(String),
    LogPuts(String),
    MenuAdd(c_int, String),
    MenuAddEntry(c_int, c_int, String),
    MenuRemove(c_int),
    MenuEntryRemove(c_int, c_int),
    MenuClear(c_int),
    SkipExceptions(bool),
}

#[derive(Default)]
struct State
{
    callbacks: HashMap<CallbackType, CallbackFn>,
    commands: HashMap<String, CommandFn>,
    expr_functions: HashMap<String, (ExprFunctionFn, usize)>,
    calls: Vec<HostCall>,
}

/// In-memory host.
///
/// Rejects duplicate command and expression function names like the real
/// host does, and can be told to reject every registration.
#[derive(Default)]
pub struct MockHost
{
    state: Mutex<State>,
    reject_all: AtomicBool,
    next_menu: AtomicI32,
}

impl MockHost
{
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self {
            next_menu: AtomicI32::new(100),
            ..Self::default()
        })
    }

    pub fn reject_all(&self, reject: bool)
    {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    fn rejecting(&self) -> bool
    {
        self.reject_all.load(Ordering::SeqCst)
    }

    pub fn callback(&self, cb_type: CallbackType) -> Option<CallbackFn>
    {
        self.state.lock().unwrap().callbacks.get(&cb_type).copied()
    }

    pub fn command(&self, name: &str) -> Option<CommandFn>
    {
        self.state.lock().unwrap().commands.get(name).copied()
    }

    pub fn expr_function(&self, name: &str) -> Option<(ExprFunctionFn, usize)>
    {
        self.state.lock().unwrap().expr_functions.get(name).copied()
    }

    pub fn command_names(&self) -> HashSet<String>
    {
        self.state.lock().unwrap().commands.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<HostCall>
    {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn logged(&self) -> Vec<String>
    {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::LogPrint(text) | HostCall::LogPuts(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall)
    {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn text(value: &CStr) -> String
{
    value.to_string_lossy().into_owned()
}

impl Host for MockHost
{
    fn register_callback(&self, _plugin: PluginHandle, cb_type: CallbackType, callback: CallbackFn)
    {
        self.state.lock().unwrap().callbacks.insert(cb_type, callback);
    }

    fn unregister_callback(&self, _plugin: PluginHandle, cb_type: CallbackType) -> bool
    {
        !self.rejecting() && self.state.lock().unwrap().callbacks.remove(&cb_type).is_some()
    }

    fn register_command(&self, _plugin: PluginHandle, name: &CStr, callback: CommandFn, _debug_only: bool) -> bool
    {
        if self.rejecting() {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        let name = text(name);
        if state.commands.contains_key(&name) {
            return false;
        }
        state.commands.insert(name, callback);
        true
    }

    fn unregister_command(&self, _plugin: PluginHandle, name: &CStr) -> bool
    {
        !self.rejecting() && self.state.lock().unwrap().commands.remove(&text(name)).is_some()
    }

    fn register_expr_function(
        &self,
        _plugin: PluginHandle,
        name: &CStr,
        _argc: c_int,
        callback: ExprFunctionFn,
        userdata: usize,
    ) -> bool
    {
        if self.rejecting() {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        let name = text(name);
        if state.expr_functions.contains_key(&name) {
            return false;
        }
        state.expr_functions.insert(name, (callback, userdata));
        true
    }

    fn unregister_expr_function(&self, _plugin: PluginHandle, name: &CStr) -> bool
    {
        !self.rejecting() && self.state.lock().unwrap().expr_functions.remove(&text(name)).is_some()
    }

    fn log_print(&self, value: &CStr)
    {
        self.record(HostCall::LogPrint(text(value)));
    }

    fn log_puts(&self, value: &CStr)
    {
        self.record(HostCall::LogPuts(text(value)));
    }

    fn menu_add(&self, parent: MenuHandle, title: &CStr) -> c_int
    {
        self.record(HostCall::MenuAdd(parent.0, text(title)));
        if self.rejecting() {
            -1
        } else {
            self.next_menu.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn menu_add_entry(&self, menu: MenuHandle, entry: MenuEntryId, title: &CStr) -> bool
    {
        self.record(HostCall::MenuAddEntry(menu.0, entry.0, text(title)));
        !self.rejecting()
    }

    fn menu_remove(&self, menu: MenuHandle) -> bool
    {
        self.record(HostCall::MenuRemove(menu.0));
        !self.rejecting()
    }

    fn menu_entry_remove(&self, plugin: PluginHandle, entry: MenuEntryId) -> bool
    {
        self.record(HostCall::MenuEntryRemove(plugin.0, entry.0));
        !self.rejecting()
    }

    fn menu_clear(&self, menu: MenuHandle) -> bool
    {
        self.record(HostCall::MenuClear(menu.0));
        !self.rejecting()
    }

    fn debug_skip_exceptions(&self, skip: bool)
    {
        self.record(HostCall::SkipExceptions(skip));
    }
}

/// Captures contained faults as display strings.
#[derive(Default)]
pub struct RecordingSink
{
    faults: Mutex<Vec<String>>,
}

impl RecordingSink
{
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self::default())
    }

    pub fn faults(&self) -> Vec<String>
    {
        self.faults.lock().unwrap().clone()
    }
}

impl FaultSink for RecordingSink
{
    fn report(&self, fault: &Fault)
    {
        self.faults.lock().unwrap().push(fault.to_string());
    }
}

/// A bridge over a fresh [`MockHost`] reporting into a fresh [`RecordingSink`].
pub fn bridge() -> (Bridge, Arc<MockHost>, Arc<RecordingSink>)
{
    let host = MockHost::new();
    let sink = RecordingSink::new();
    let bridge = Bridge::with_fault_sink(host.clone(), sink.clone());
    (bridge, host, sink)
}

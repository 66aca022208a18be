//! # Bridge
//!
//! [`Bridge`] owns everything the host can reach: the three registries, the
//! handle table backing expression function user data, and the fault sink.
//!
//! Trampolines find their registry through the one process-wide bridge
//! published by [`Bridge::install`]. Bridges that are never installed are
//! still fully usable through the direct `invoke` / `evaluate` / `dispatch`
//! methods, which is how the registries are tested.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plugbridge_core::{Bridge, NativeHost};
//!
//! let bridge = Bridge::new(Arc::new(NativeHost)).install()?;
//! bridge.commands().register(handle, "hello", |_| Ok(true), false)?;
//! ```

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::guard::{FaultSink, HostFaultSink};
use crate::handles::HandleTable;
use crate::host::Host;
use crate::plugin::{Plugin, PLUGIN_CALLBACKS};
use crate::registry::{lock, CallbackRegistry, CommandRegistry, ExprFunctionRegistry};
use crate::trampolines::{callback_trampoline, COMMAND_TRAMPOLINES, EXPR_TRAMPOLINES};
use crate::types::{CallbackType, MenuEntryId, MenuHandle, PlugSetupStruct, PluginHandle};

static INSTALLED: OnceCell<Bridge> = OnceCell::new();

/// The native callback bridge.
pub struct Bridge
{
    host: Arc<dyn Host>,
    fault_sink: Arc<dyn FaultSink>,
    handles: Arc<HandleTable>,
    callbacks: CallbackRegistry,
    commands: CommandRegistry,
    expr_functions: ExprFunctionRegistry,
    plugins: Mutex<HashMap<PluginHandle, Arc<dyn Plugin>>>,
}

impl Bridge
{
    /// Create a bridge reporting contained faults to the host's log.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self
    {
        let sink = Arc::new(HostFaultSink::new(Arc::clone(&host)));
        Self::with_fault_sink(host, sink)
    }

    /// Create a bridge with a custom fault sink.
    #[must_use]
    pub fn with_fault_sink(host: Arc<dyn Host>, fault_sink: Arc<dyn FaultSink>) -> Self
    {
        let handles = Arc::new(HandleTable::new());
        Self {
            callbacks: CallbackRegistry::new(Arc::clone(&host), callback_trampoline),
            commands: CommandRegistry::new(Arc::clone(&host), &COMMAND_TRAMPOLINES),
            expr_functions: ExprFunctionRegistry::new(Arc::clone(&host), Arc::clone(&handles), &EXPR_TRAMPOLINES),
            handles,
            fault_sink,
            host,
            plugins: Mutex::new(HashMap::new()),
        }
    }

    /// Publish this bridge as the target of every trampoline.
    ///
    /// ## Errors
    ///
    /// `AlreadyInstalled` if a bridge was installed before. The installed
    /// bridge lives until the process exits.
    pub fn install(self) -> BridgeResult<&'static Bridge>
    {
        INSTALLED.set(self).map_err(|_| BridgeError::AlreadyInstalled)?;
        let bridge = INSTALLED.get().ok_or(BridgeError::NotInstalled)?;
        info!("plugin bridge installed");
        Ok(bridge)
    }

    /// The bridge published by [`Self::install`], if any.
    #[must_use]
    pub fn installed() -> Option<&'static Bridge>
    {
        INSTALLED.get()
    }

    /// Event callback registry
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry
    {
        &self.callbacks
    }

    /// Command registry
    #[must_use]
    pub fn commands(&self) -> &CommandRegistry
    {
        &self.commands
    }

    /// Expression function registry
    #[must_use]
    pub fn expr_functions(&self) -> &ExprFunctionRegistry
    {
        &self.expr_functions
    }

    /// Handle table anchoring expression function user data
    #[must_use]
    pub fn handles(&self) -> &HandleTable
    {
        &self.handles
    }

    /// Sink receiving faults contained at the native boundary
    #[must_use]
    pub fn fault_sink(&self) -> &dyn FaultSink
    {
        self.fault_sink.as_ref()
    }

    /// Host this bridge talks to
    #[must_use]
    pub fn host(&self) -> &dyn Host
    {
        self.host.as_ref()
    }

    /// Print a line to the host's log window. Text after a NUL is dropped.
    pub fn log_print(&self, text: &str)
    {
        self.host.log_print(&host_text(text));
    }

    /// Print raw text to the host's log window. Text after a NUL is dropped.
    pub fn log_puts(&self, text: &str)
    {
        self.host.log_puts(&host_text(text));
    }

    /// Add a submenu under `parent`. `None` if the host refused.
    pub fn menu_add(&self, parent: MenuHandle, title: &str) -> Option<MenuHandle>
    {
        match self.host.menu_add(parent, &host_text(title)) {
            -1 => {
                warn!(parent = parent.0, title, "host refused to add menu");
                None
            }
            handle => Some(MenuHandle(handle)),
        }
    }

    /// Add an entry to `menu`; clicks arrive as `CB_MENUENTRY` with `entry`.
    pub fn menu_add_entry(&self, menu: MenuHandle, entry: MenuEntryId, title: &str) -> bool
    {
        self.host.menu_add_entry(menu, entry, &host_text(title))
    }

    /// Remove a submenu and everything below it.
    pub fn menu_remove(&self, menu: MenuHandle) -> bool
    {
        self.host.menu_remove(menu)
    }

    /// Remove one entry added by `plugin`.
    pub fn menu_entry_remove(&self, plugin: PluginHandle, entry: MenuEntryId) -> bool
    {
        self.host.menu_entry_remove(plugin, entry)
    }

    /// Remove every entry of `menu`.
    pub fn menu_clear(&self, menu: MenuHandle) -> bool
    {
        self.host.menu_clear(menu)
    }

    /// Make the debugger pass exceptions to the debuggee without stopping.
    pub fn debug_skip_exceptions(&self, skip: bool)
    {
        self.host.debug_skip_exceptions(skip);
    }

    /// Initialise `plugin` and route its lifecycle hooks.
    ///
    /// Returns `Ok(false)` without registering anything if
    /// [`Plugin::init`] declined.
    ///
    /// ## Errors
    ///
    /// `Callback` if [`Plugin::init`] failed.
    pub fn attach_plugin(&self, owner: PluginHandle, plugin: Arc<dyn Plugin>) -> BridgeResult<bool>
    {
        if !plugin.init(owner).map_err(BridgeError::Callback)? {
            warn!(plugin = %owner, name = plugin.name(), "plugin declined initialisation");
            return Ok(false);
        }

        let hooks = Arc::clone(&plugin);
        self.callbacks.register(owner, CallbackType::InitDebug, move |info| {
            hooks.on_init_debug(&info.init_debug()?)
        })?;
        let hooks = Arc::clone(&plugin);
        self.callbacks.register(owner, CallbackType::StopDebug, move |info| {
            info.stop_debug()?;
            hooks.on_stop_debug()
        })?;
        let hooks = Arc::clone(&plugin);
        self.callbacks.register(owner, CallbackType::CreateProcess, move |info| {
            hooks.on_create_process(&info.create_process()?)
        })?;
        let hooks = Arc::clone(&plugin);
        self.callbacks
            .register(owner, CallbackType::LoadDll, move |info| hooks.on_load_dll(&info.load_dll()?))?;
        let hooks = Arc::clone(&plugin);
        self.callbacks
            .register(owner, CallbackType::MenuEntry, move |info| hooks.on_menu_entry(info.menu_entry()?))?;

        info!(plugin = %owner, name = plugin.name(), version = plugin.version(), "plugin attached");
        lock(&self.plugins).insert(owner, plugin);
        Ok(true)
    }

    /// Pass the host's menu handles to an attached plugin.
    ///
    /// Returns `Ok(false)` if no plugin is attached as `owner`.
    pub fn setup_plugin(&self, owner: PluginHandle, setup: &PlugSetupStruct) -> BridgeResult<bool>
    {
        let Some(plugin) = lock(&self.plugins).get(&owner).cloned() else {
            return Ok(false);
        };
        plugin.setup(setup).map_err(BridgeError::Callback)?;
        Ok(true)
    }

    /// Unregister `owner`'s hooks and stop it.
    ///
    /// Returns `Ok(false)` if no plugin is attached as `owner`.
    pub fn detach_plugin(&self, owner: PluginHandle) -> BridgeResult<bool>
    {
        let Some(plugin) = lock(&self.plugins).remove(&owner) else {
            return Ok(false);
        };
        for kind in PLUGIN_CALLBACKS {
            if !self.callbacks.unregister(owner, kind) {
                debug!(plugin = %owner, cb_type = kind.c_name(), "plugin callback was not registered");
            }
        }
        plugin.stop().map_err(BridgeError::Callback)?;
        info!(plugin = %owner, name = plugin.name(), "plugin detached");
        Ok(true)
    }
}

impl fmt::Debug for Bridge
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Bridge")
            .field("callbacks", &self.callbacks)
            .field("commands", &self.commands)
            .field("expr_functions", &self.expr_functions)
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

fn host_text(text: &str) -> CString
{
    let visible = text.split('\0').next().unwrap_or_default();
    CString::new(visible).unwrap_or_default()
}

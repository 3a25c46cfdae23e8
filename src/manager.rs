//! Plugin Manager
//!
//! One [`PluginManager`] serves one host window. It owns that window's
//! live plugin instances and menu registrations, drives the host event
//! dispatcher, and coordinates with the process-wide
//! [`SharedRuntime`](crate::shared::SharedRuntime) for everything that
//! outlives the window: the module cache, static instances, button order
//! and shortcut bindings.
//!
//! ## Lifecycle
//!
//! Construction loads every enabled background plugin and attaches to the
//! shared runtime. `close` tears down one bucket of instances (interactive
//! or everything else) per call; the per-window instance map empties only
//! when the local reference count reaches zero. Re-loading an identifier
//! after close always constructs a fresh instance.
//!
//! Every call into plugin code is guarded: a panic or error is reported
//! through the injected [`FaultReporter`] and degrades that one plugin,
//! never the manager.

use std::collections::HashMap;
use std::sync::Arc;

use tabweave_core::{same_client, EndCode, PluginKind, SharedClient, ViewFilter, ViewFilterCore};
use tracing::{debug, warn};

use crate::catalog::ModuleRecord;
use crate::descriptor::PluginDescriptor;
use crate::dispatch::{EventDispatcher, ExplorerAction, MenuTarget};
use crate::error::RuntimeResult;
use crate::instance::PluginInstance;
use crate::report::{guarded_call, FaultReporter};
use crate::shared::SharedRuntime;
use crate::store::StateStore;

// ============================================================================
// Shortcut binding reconciliation
// ============================================================================

/// Merge a persisted binding array with the action count a plugin just
/// declared: existing positions are preserved, extra positions default to
/// unbound (0), surplus persisted entries are dropped.
fn reconcile_bindings(existing: Option<Vec<i32>>, action_count: usize) -> Vec<i32> {
    match existing {
        Some(bindings) if bindings.len() == action_count => bindings,
        Some(bindings) => {
            let mut next = vec![0; action_count];
            let keep = bindings.len().min(action_count);
            next[..keep].copy_from_slice(&bindings[..keep]);
            next
        }
        None => vec![0; action_count],
    }
}

// ============================================================================
// Static plugin loading
// ============================================================================

/// Load a static-kind plugin into the shared instance map.
///
/// When no encoding detector is adopted yet (or `force` is set) and the
/// new instance offers one, the plugin is opened detached and its detector
/// becomes the process-wide detector. Returns whether adoption happened.
pub(crate) fn load_static_plugin(
    shared: &SharedRuntime,
    reporter: &dyn FaultReporter,
    descriptor: &Arc<PluginDescriptor>,
    record: &ModuleRecord,
    force: bool,
) -> bool {
    let Some(instance) = record.load(descriptor.id(), reporter) else {
        return false;
    };
    let client = instance.client().cloned();
    let detector = instance.capabilities().encoding_detector.clone();
    shared.insert_static(descriptor.id().to_string(), instance);

    if shared.encoding_detector().is_none() || force {
        if let (Some(client), Some(detector)) = (client, detector) {
            let opened = guarded_call(
                reporter,
                None,
                descriptor.name(),
                "loading static plugin",
                || client.open_detached(),
            );
            if opened.is_some() {
                shared.set_encoding_detector(detector);
                return true;
            }
        }
    }
    false
}

// ============================================================================
// Plugin Manager
// ============================================================================

/// Per-window plugin orchestrator.
pub struct PluginManager {
    shared: Arc<SharedRuntime>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    store: Arc<dyn StateStore>,
    reporter: Arc<dyn FaultReporter>,
    instances: HashMap<String, PluginInstance>,
    menu_bar: HashMap<String, String>,
    menu_tab: HashMap<String, String>,
    view_filter: Option<Arc<dyn ViewFilter>>,
    filter_core: Option<Arc<dyn ViewFilterCore>>,
    ref_count: u32,
    closing_count: u32,
}

impl PluginManager {
    /// Bind a manager to one host window. Loads every enabled background
    /// plugin immediately and takes one attachment reference on the shared
    /// runtime.
    pub fn new(
        shared: Arc<SharedRuntime>,
        dispatcher: Arc<dyn EventDispatcher>,
        store: Arc<dyn StateStore>,
        reporter: Arc<dyn FaultReporter>,
    ) -> Self {
        let mut manager = Self {
            shared,
            dispatcher: Some(dispatcher),
            store,
            reporter,
            instances: HashMap::new(),
            menu_bar: HashMap::new(),
            menu_tab: HashMap::new(),
            view_filter: None,
            filter_core: None,
            ref_count: 0,
            closing_count: 0,
        };
        manager.load_startup_plugins();
        manager.ref_count += 1;
        manager.shared.attach();
        manager
    }

    /// Record one more host attachment sharing this manager.
    pub fn add_ref(&mut self) {
        self.ref_count += 1;
        self.shared.attach();
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load the plugin behind `descriptor` into this manager's live map.
    ///
    /// The owning module record is resolved from the shared cache when not
    /// supplied. On success the instance is registered under its
    /// identifier (silently replacing any previous instance, which is not
    /// closed) and the open handshake runs against the dispatcher; if the
    /// plugin declares shortcut actions, persisted bindings are reconciled
    /// against the declared action count. Every failure returns `None`.
    pub fn load(
        &mut self,
        descriptor: &Arc<PluginDescriptor>,
        module: Option<&Arc<ModuleRecord>>,
    ) -> Option<&PluginInstance> {
        let record = match module {
            Some(record) => Arc::clone(record),
            None => self.shared.module_for(descriptor.module_path())?,
        };
        let instance = record.load(descriptor.id(), self.reporter.as_ref())?;
        let client = instance.client().cloned();
        let id = descriptor.id().to_string();
        self.instances.insert(id.clone(), instance);

        if let (Some(dispatcher), Some(client)) = (self.dispatcher.clone(), client) {
            let handshake = guarded_call(
                self.reporter.as_ref(),
                None,
                descriptor.name(),
                "loading plugin",
                || Ok(dispatcher.open_plugin(&client)),
            );
            let (supported, actions) = handshake?;
            if supported && !actions.is_empty() {
                descriptor.set_shortcut_actions(actions.clone());
                let existing = self.shared.binding_for(&id);
                self.shared
                    .set_binding(id.clone(), reconcile_bindings(existing, actions.len()));
            }
        }

        self.instances.get(&id)
    }

    /// Auto-load enabled background plugins; run at construction.
    fn load_startup_plugins(&mut self) {
        for descriptor in self.shared.plugin_descriptors() {
            if !descriptor.is_enabled() {
                continue;
            }
            match descriptor.kind() {
                PluginKind::Background => {
                    if self.load(&descriptor, None).is_some() {
                        self.adopt_filters_from(descriptor.id());
                    } else {
                        descriptor.set_enabled(false);
                    }
                }
                PluginKind::BackgroundMultiple => {
                    if self.load(&descriptor, None).is_none() {
                        descriptor.set_enabled(false);
                    }
                }
                // interactive loads on demand, statics load at process scope
                _ => {}
            }
        }
    }

    /// Adopt filter capabilities from the instance under `id` into the
    /// still-unset filter slots. First successfully registered provider
    /// wins and is never replaced while set.
    fn adopt_filters_from(&mut self, id: &str) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let capabilities = instance.capabilities();
        if self.view_filter.is_none() {
            self.view_filter = capabilities.view_filter.clone();
        }
        if self.filter_core.is_none() {
            self.filter_core = capabilities.filter_core.clone();
        }
    }

    /// Reconcile a rescanned module against this manager's state: unload
    /// now-disabled descriptors, load enabled background descriptors that
    /// are not yet live (disabling them on failure), and optionally load
    /// newly enabled statics missing from the shared map.
    pub fn refresh_module(&mut self, record: &Arc<ModuleRecord>, include_statics: bool) {
        for descriptor in record.descriptors() {
            let id = descriptor.id().to_string();
            if !descriptor.is_enabled() {
                self.unload_instance(&id, EndCode::Unloaded, include_statics);
            } else if descriptor.kind() == PluginKind::Background {
                let present = self.instances.contains_key(&id);
                let loaded = present || self.load(&descriptor, Some(record)).is_some();
                if loaded {
                    self.adopt_filters_from(&id);
                } else {
                    descriptor.set_enabled(false);
                }
            } else if descriptor.kind() == PluginKind::BackgroundMultiple {
                if !self.instances.contains_key(&id)
                    && self.load(&descriptor, Some(record)).is_none()
                {
                    descriptor.set_enabled(false);
                }
            } else if include_statics
                && descriptor.kind() == PluginKind::Static
                && !self.shared.has_static(&id)
            {
                load_static_plugin(&self.shared, self.reporter.as_ref(), &descriptor, record, false);
            }
        }
    }

    // ------------------------------------------------------------------
    // Menu registrations
    // ------------------------------------------------------------------

    /// Plugin-facing menu contribution API. Matches at most one live
    /// instance by client identity, then records or removes `text` under
    /// the surfaces selected by `target`.
    pub fn register_menu(
        &mut self,
        client: &SharedClient,
        target: MenuTarget,
        text: &str,
        register: bool,
    ) {
        for instance in self.instances.values() {
            let Some(existing) = instance.client() else {
                continue;
            };
            if !same_client(existing, client) {
                continue;
            }
            let Some(descriptor) = instance.descriptor() else {
                break;
            };
            let id = descriptor.id().to_string();
            if register {
                if target.includes_bar() {
                    self.menu_bar.insert(id.clone(), text.to_string());
                }
                if target.includes_tab() {
                    self.menu_tab.insert(id, text.to_string());
                }
            } else {
                if target.includes_bar() {
                    self.menu_bar.remove(&id);
                }
                if target.includes_tab() {
                    self.menu_tab.remove(&id);
                }
            }
            break;
        }
    }

    /// Current button-bar menu contributions, sorted by identifier.
    pub fn bar_menu_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .menu_bar
            .iter()
            .map(|(id, text)| (id.clone(), text.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Current tab menu contributions, sorted by identifier.
    pub fn tab_menu_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .menu_tab
            .iter()
            .map(|(id, text)| (id.clone(), text.clone()))
            .collect();
        entries.sort();
        entries
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Tear down one bucket of instances for a closing host window.
    ///
    /// `interactive` selects which bucket closes: interactive-kind
    /// instances, or everything else. The first teardown pass of this
    /// manager also clears the dispatcher's event subscriptions;
    /// non-interactive teardown drops the adopted filter providers. When
    /// the local reference count reaches zero the whole instance map is
    /// cleared and the dispatcher handle released.
    pub fn close(&mut self, interactive: bool) {
        self.ref_count = self.ref_count.saturating_sub(1);
        if self.closing_count == 0 {
            if let Some(dispatcher) = &self.dispatcher {
                dispatcher.clear_events();
            }
        }
        for instance in self.instances.values_mut() {
            let Some(descriptor) = instance.descriptor() else {
                continue;
            };
            if (descriptor.kind() == PluginKind::Interactive) == interactive {
                instance.close(EndCode::WindowClosed, self.reporter.as_ref());
            }
        }
        if !interactive {
            self.view_filter = None;
            self.filter_core = None;
        }
        if self.ref_count == 0 {
            self.instances.clear();
            self.dispatcher = None;
        }
        self.closing_count += 1;
        self.shared.detach();
    }

    /// Unload one identifier: menu registrations go regardless of
    /// presence; a live instance is unsubscribed from the dispatcher and
    /// closed. With `is_static` the identifier also leaves the button
    /// order and, for static-kind plugins, the shared static instance is
    /// closed and removed.
    pub fn unload_instance(&mut self, id: &str, code: EndCode, is_static: bool) {
        if is_static {
            self.shared.remove_from_button_order(id);
        }
        self.menu_bar.remove(id);
        self.menu_tab.remove(id);
        if let Some(mut instance) = self.instances.remove(id) {
            if let (Some(dispatcher), Some(client)) = (&self.dispatcher, instance.client()) {
                dispatcher.remove_events(client);
            }
            instance.close(code, self.reporter.as_ref());
        }
        if is_static {
            let static_kind = self
                .shared
                .descriptor_for(id)
                .map(|d| d.kind() == PluginKind::Static)
                .unwrap_or(false);
            if static_kind {
                if let Some(mut instance) = self.shared.remove_static(id) {
                    instance.close(code, self.reporter.as_ref());
                }
            }
        }
    }

    /// Unload every plugin in `record` with the removed reason. With
    /// `is_static` this is a full uninstall: persisted shortcut bindings
    /// and button-order slots are purged and saved, the module leaves the
    /// shared cache, its uninstall hooks run, and the record is disposed.
    pub fn uninstall_module(&mut self, record: &Arc<ModuleRecord>, is_static: bool) {
        for descriptor in record.descriptors() {
            self.unload_instance(descriptor.id(), EndCode::Removed, is_static);
            if is_static {
                self.shared.remove_binding(descriptor.id());
            }
        }
        if is_static {
            self.shared.remove_module(record.path());
            if let Err(e) = self.store.save_shortcut_keys(&self.shared.shortcut_keys()) {
                warn!(error = %e, "failed to persist shortcut keys");
            }
            if let Err(e) = self.store.save_button_order(&self.shared.activated_buttons()) {
                warn!(error = %e, "failed to persist button order");
            }
            record.run_uninstall_hooks(self.reporter.as_ref());
            record.dispose();
            debug!(module = %record.path().display(), "plugin module uninstalled");
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Live instance registered under `id`, if any.
    pub fn instance(&self, id: &str) -> Option<&PluginInstance> {
        self.instances.get(id)
    }

    /// Mutable access to the instance under `id`, for toggling its
    /// background-button integration.
    pub fn instance_mut(&mut self, id: &str) -> Option<&mut PluginInstance> {
        self.instances.get_mut(id)
    }

    /// Whether any instance (live or closed) is registered under `id`.
    pub fn is_loaded(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    /// Every registered instance.
    pub fn instances(&self) -> impl Iterator<Item = &PluginInstance> {
        self.instances.values()
    }

    /// Map a client handle back to its plugin identifier, or to its type
    /// name with `want_type_name`.
    pub fn identify_client(&self, client: &SharedClient, want_type_name: bool) -> Option<String> {
        self.instances.values().find_map(|instance| {
            let existing = instance.client()?;
            if !same_client(existing, client) {
                return None;
            }
            let descriptor = instance.descriptor()?;
            Some(if want_type_name {
                descriptor.type_name().to_string()
            } else {
                descriptor.id().to_string()
            })
        })
    }

    /// The adopted per-item view filter, if any.
    pub fn view_filter(&self) -> Option<Arc<dyn ViewFilter>> {
        self.view_filter.clone()
    }

    /// The adopted batch view filter, if any.
    pub fn filter_core(&self) -> Option<Arc<dyn ViewFilterCore>> {
        self.filter_core.clone()
    }

    /// Drop both adopted filter providers.
    pub fn clear_filter_engines(&mut self) {
        self.view_filter = None;
        self.filter_core = None;
    }

    /// Whether any plugin currently subscribes to selection changes.
    pub fn selection_change_attached(&self) -> bool {
        self.dispatcher
            .as_ref()
            .map(|d| d.selection_changed_attached())
            .unwrap_or(false)
    }

    /// Persist the shared activated-button order.
    pub fn save_button_order(&self) -> RuntimeResult<()> {
        self.store.save_button_order(&self.shared.activated_buttons())
    }

    // ------------------------------------------------------------------
    // Host event fan-out
    // ------------------------------------------------------------------
    // Pure pass-throughs; inert once the dispatcher handle is released.

    pub fn on_explorer_state_changed(&self, action: ExplorerAction) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_explorer_state_changed(action);
        }
    }

    pub fn on_menu_renderer_changed(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_menu_renderer_changed();
        }
    }

    pub fn on_mouse_enter(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_mouse_enter();
        }
    }

    pub fn on_mouse_leave(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_mouse_leave();
        }
    }

    pub fn on_navigation_complete(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_navigation_complete(index, id_list, path);
        }
    }

    pub fn on_pointed_tab_changed(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_pointed_tab_changed(index, id_list, path);
        }
    }

    pub fn on_selection_changed(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_selection_changed(index, id_list, path);
        }
    }

    pub fn on_settings_changed(&self, kind: i32) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_settings_changed(kind);
        }
    }

    pub fn on_tab_added(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_tab_added(index, id_list, path);
        }
    }

    pub fn on_tab_changed(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_tab_changed(index, id_list, path);
        }
    }

    pub fn on_tab_removed(&self, index: i32, id_list: &[u8], path: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.on_tab_removed(index, id_list, path);
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("instances", &self.instances.len())
            .field("ref_count", &self.ref_count)
            .field("closing_count", &self.closing_count)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}

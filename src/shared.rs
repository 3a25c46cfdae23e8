//! Shared Runtime Registry
//!
//! Process-wide state that outlives any single window: the module cache,
//! static plugin instances, the adopted encoding detector, toolbar button
//! order, and per-plugin shortcut key bindings. One [`SharedRuntime`] is
//! created by the host and handed to every
//! [`PluginManager`](crate::manager::PluginManager) as an `Arc`, so the
//! cache survives window churn and is dropped only when the host lets go
//! of the last handle.
//!
//! All maps sit behind coarse `Mutex` guards. Plugin code is never invoked
//! while a guard is held; callers take snapshots or move owned values out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tabweave_core::EncodingDetector;

use crate::catalog::ModuleRecord;
use crate::descriptor::PluginDescriptor;
use crate::instance::PluginInstance;

// Poisoned guards are recovered; plugin panics never run under these locks.
fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Activated Button
// ============================================================================

/// One slot in the persisted toolbar button order: which plugin's button
/// occupies which position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedButton {
    /// Plugin identifier owning the button
    pub id: String,
    /// Zero-based toolbar position
    pub index: i32,
}

impl ActivatedButton {
    pub fn new(id: impl Into<String>, index: i32) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

// ============================================================================
// Shared Runtime
// ============================================================================

/// Cross-window plugin state, injected into every manager.
#[derive(Default)]
pub struct SharedRuntime {
    modules: Mutex<HashMap<PathBuf, Arc<ModuleRecord>>>,
    statics: Mutex<HashMap<String, PluginInstance>>,
    encoding_detector: Mutex<Option<Arc<dyn EncodingDetector>>>,
    button_order: Mutex<Vec<ActivatedButton>>,
    shortcut_keys: Mutex<HashMap<String, Vec<i32>>>,
    known_capabilities: Mutex<HashMap<String, Vec<String>>>,
    attachments: AtomicUsize,
}

impl SharedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Manager attachment
    // ------------------------------------------------------------------

    /// Record one more attached manager reference; returns the new count.
    pub fn attach(&self) -> usize {
        self.attachments.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Release one manager reference; returns the new count. Saturates at
    /// zero rather than underflowing on an unbalanced release.
    pub fn detach(&self) -> usize {
        let previous = self
            .attachments
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Number of currently attached manager references.
    pub fn attachment_count(&self) -> usize {
        self.attachments.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Module cache
    // ------------------------------------------------------------------

    /// Cache a record under its path. A different record already cached
    /// for the same path is disposed before being replaced; re-adding the
    /// same record is a no-op.
    pub fn add_module(&self, record: Arc<ModuleRecord>) {
        let mut modules = guard(&self.modules);
        let path = record.path().to_path_buf();
        if let Some(old) = modules.get(&path) {
            if Arc::ptr_eq(old, &record) {
                return;
            }
            old.dispose();
        }
        modules.insert(path, record);
    }

    /// Remove and return the record cached under `path`.
    pub fn remove_module(&self, path: &Path) -> Option<Arc<ModuleRecord>> {
        guard(&self.modules).remove(path)
    }

    /// Record cached under `path`, if any.
    pub fn module_for(&self, path: &Path) -> Option<Arc<ModuleRecord>> {
        guard(&self.modules).get(path).cloned()
    }

    /// Snapshot of every cached record.
    pub fn modules(&self) -> Vec<Arc<ModuleRecord>> {
        guard(&self.modules).values().cloned().collect()
    }

    /// Paths of every cached record.
    pub fn module_paths(&self) -> Vec<PathBuf> {
        guard(&self.modules).keys().cloned().collect()
    }

    /// Every descriptor across every cached module.
    pub fn plugin_descriptors(&self) -> Vec<Arc<PluginDescriptor>> {
        guard(&self.modules)
            .values()
            .flat_map(|record| record.descriptors())
            .collect()
    }

    /// Find a descriptor by plugin identifier across all cached modules.
    pub fn descriptor_for(&self, id: &str) -> Option<Arc<PluginDescriptor>> {
        guard(&self.modules)
            .values()
            .find_map(|record| record.descriptor(id))
    }

    // ------------------------------------------------------------------
    // Static plugin instances
    // ------------------------------------------------------------------

    /// Store a static instance under its plugin identifier, replacing any
    /// previous entry. The replaced instance is dropped without a close
    /// notification; callers that need one must remove it first.
    pub fn insert_static(&self, id: impl Into<String>, instance: PluginInstance) {
        guard(&self.statics).insert(id.into(), instance);
    }

    /// Whether a static instance exists for `id`.
    pub fn has_static(&self, id: &str) -> bool {
        guard(&self.statics).contains_key(id)
    }

    /// Remove and return the static instance for `id`.
    pub fn remove_static(&self, id: &str) -> Option<PluginInstance> {
        guard(&self.statics).remove(id)
    }

    /// Run `f` against the static instance for `id`, if present.
    pub fn with_static<R>(&self, id: &str, f: impl FnOnce(&PluginInstance) -> R) -> Option<R> {
        guard(&self.statics).get(id).map(f)
    }

    /// Identifiers of every stored static instance.
    pub fn static_ids(&self) -> Vec<String> {
        guard(&self.statics).keys().cloned().collect()
    }

    /// Number of stored static instances.
    pub fn static_count(&self) -> usize {
        guard(&self.statics).len()
    }

    // ------------------------------------------------------------------
    // Encoding detector
    // ------------------------------------------------------------------

    /// The adopted encoding detector, if any static plugin offered one.
    pub fn encoding_detector(&self) -> Option<Arc<dyn EncodingDetector>> {
        guard(&self.encoding_detector).clone()
    }

    /// Adopt `detector` as the process-wide encoding detector.
    pub fn set_encoding_detector(&self, detector: Arc<dyn EncodingDetector>) {
        *guard(&self.encoding_detector) = Some(detector);
    }

    /// Drop the adopted encoding detector.
    pub fn clear_encoding_detector(&self) {
        *guard(&self.encoding_detector) = None;
    }

    // ------------------------------------------------------------------
    // Toolbar button order
    // ------------------------------------------------------------------

    /// Snapshot of the activated toolbar button order.
    pub fn activated_buttons(&self) -> Vec<ActivatedButton> {
        guard(&self.button_order).clone()
    }

    /// Replace the activated toolbar button order.
    pub fn set_activated_buttons(&self, order: Vec<ActivatedButton>) {
        *guard(&self.button_order) = order;
    }

    /// Remove every order slot owned by `id`; returns whether any slot
    /// was removed.
    pub fn remove_from_button_order(&self, id: &str) -> bool {
        let mut order = guard(&self.button_order);
        let before = order.len();
        order.retain(|slot| slot.id != id);
        order.len() != before
    }

    // ------------------------------------------------------------------
    // Shortcut key bindings
    // ------------------------------------------------------------------

    /// Snapshot of every persisted shortcut binding.
    pub fn shortcut_keys(&self) -> HashMap<String, Vec<i32>> {
        guard(&self.shortcut_keys).clone()
    }

    /// Replace the whole binding map.
    pub fn set_shortcut_keys(&self, keys: HashMap<String, Vec<i32>>) {
        *guard(&self.shortcut_keys) = keys;
    }

    /// Bound keys for `id`, one slot per declared shortcut action.
    pub fn binding_for(&self, id: &str) -> Option<Vec<i32>> {
        guard(&self.shortcut_keys).get(id).cloned()
    }

    /// Store the binding sequence for `id`.
    pub fn set_binding(&self, id: impl Into<String>, keys: Vec<i32>) {
        guard(&self.shortcut_keys).insert(id.into(), keys);
    }

    /// Remove the binding sequence for `id`; returns whether one existed.
    pub fn remove_binding(&self, id: &str) -> bool {
        guard(&self.shortcut_keys).remove(id).is_some()
    }

    // ------------------------------------------------------------------
    // Advisory capability map
    // ------------------------------------------------------------------

    /// Snapshot of the persisted capability advisory map. Entries describe
    /// what each plugin offered when it was last configured; the runtime
    /// reads them for display only and never trusts them for dispatch.
    pub fn known_capabilities(&self) -> HashMap<String, Vec<String>> {
        guard(&self.known_capabilities).clone()
    }

    /// Replace the capability advisory map.
    pub fn set_known_capabilities(&self, map: HashMap<String, Vec<String>>) {
        *guard(&self.known_capabilities) = map;
    }

    /// Advisory capability names recorded for `id`.
    pub fn known_capabilities_for(&self, id: &str) -> Option<Vec<String>> {
        guard(&self.known_capabilities).get(id).cloned()
    }
}

impl std::fmt::Debug for SharedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRuntime")
            .field("modules", &guard(&self.modules).len())
            .field("statics", &guard(&self.statics).len())
            .field("attachments", &self.attachment_count())
            .finish()
    }
}

//! Module Catalog
//!
//! Scanning turns an on-disk module into a [`ModuleRecord`]: the module's
//! metadata, one [`PluginDescriptor`](crate::descriptor::PluginDescriptor)
//! per registration, and the resolved entry point used later to construct
//! plugins. A module that fails to resolve still yields a record, just an
//! inert one with no descriptors; the bootstrap only caches records that
//! produced at least one descriptor.
//!
//! The [`Catalog`] wires the scan to the injected module provider, the
//! shared registry, and the persisted state: it restores module paths and
//! enablement at startup, loads enabled static plugins, and persists
//! enablement changes.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tabweave_core::{ModuleMetadata, ModuleProvider, PluginKind, SharedModuleEntry};
use tracing::{debug, info, warn};

use crate::descriptor::{module_identity, IconPair, PluginDescriptor};
use crate::error::RuntimeResult;
use crate::instance::PluginInstance;
use crate::manager::load_static_plugin;
use crate::report::{guarded_call, FaultReporter};
use crate::shared::SharedRuntime;
use crate::store::StateStore;

// ============================================================================
// Module Record
// ============================================================================

/// One scanned module: metadata, descriptors, and the live entry point.
///
/// Records are shared (`Arc`) through the process-wide module cache, so the
/// parts disposal mutates sit behind interior mutability.
pub struct ModuleRecord {
    path: PathBuf,
    name: String,
    metadata: ModuleMetadata,
    enabled: AtomicBool,
    descriptors: Mutex<HashMap<String, Arc<PluginDescriptor>>>,
    entry: Mutex<Option<SharedModuleEntry>>,
}

impl ModuleRecord {
    /// Scan the module at `path` through `provider`.
    ///
    /// A failed resolve is logged at module granularity and produces an
    /// inert record. A single registration's failure (bad metadata, a
    /// panicking resource lookup) skips that registration only.
    pub fn scan(path: &Path, provider: &dyn ModuleProvider) -> Arc<Self> {
        let entry = match provider.resolve(path) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load plugin module");
                return Arc::new(Self {
                    path: path.to_path_buf(),
                    name: String::new(),
                    metadata: ModuleMetadata::default(),
                    enabled: AtomicBool::new(false),
                    descriptors: Mutex::new(HashMap::new()),
                    entry: Mutex::new(None),
                });
            }
        };

        let metadata = entry.metadata();
        let name = module_identity(&metadata.title, &metadata.version, path);
        let mut descriptors = HashMap::new();
        for registration in entry.registrations() {
            let built = catch_unwind(AssertUnwindSafe(|| {
                if registration.type_name.is_empty() || registration.name.is_empty() {
                    return None;
                }
                let short = registration.short_type_name();
                let icons = IconPair {
                    large: entry.resource(&format!("{}_large", short)),
                    small: entry.resource(&format!("{}_small", short)),
                };
                Some(PluginDescriptor::from_registration(
                    &registration,
                    &name,
                    path,
                    icons,
                ))
            }));
            match built {
                Ok(Some(descriptor)) => {
                    descriptors.insert(descriptor.id().to_string(), Arc::new(descriptor));
                }
                Ok(None) => {
                    warn!(
                        module = %name,
                        type_name = %registration.type_name,
                        "skipping registration with missing metadata"
                    );
                }
                Err(_) => {
                    warn!(
                        module = %name,
                        type_name = %registration.type_name,
                        "skipping registration that panicked during scan"
                    );
                }
            }
        }

        debug!(
            path = %path.display(),
            module = %name,
            plugins = descriptors.len(),
            "scanned plugin module"
        );

        Arc::new(Self {
            path: path.to_path_buf(),
            name,
            metadata,
            enabled: AtomicBool::new(false),
            descriptors: Mutex::new(descriptors),
            entry: Mutex::new(Some(entry)),
        })
    }

    /// Path of the on-disk module.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Module identity string (`<title><version>(<path-hash>)`), empty for
    /// an inert record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embedded module metadata.
    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    /// Whether any contained plugin is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the module-level enabled flag.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Snapshot of every descriptor in this module.
    pub fn descriptors(&self) -> Vec<Arc<PluginDescriptor>> {
        self.descriptors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Descriptor by plugin identifier.
    pub fn descriptor(&self, id: &str) -> Option<Arc<PluginDescriptor>> {
        self.descriptors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Whether the scan produced at least one descriptor.
    pub fn has_plugins(&self) -> bool {
        !self
            .descriptors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    /// Construct the plugin registered under `id`.
    ///
    /// Every failure mode (unknown identifier, disposed record, factory
    /// error, icon-probe error, panic) is contained and yields `None`; the
    /// fault, if any, goes through `reporter`.
    pub fn load(&self, id: &str, reporter: &dyn FaultReporter) -> Option<PluginInstance> {
        let descriptor = self.descriptor(id)?;
        let entry = self
            .entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()?;
        guarded_call(reporter, None, descriptor.name(), "loading plugin", || {
            PluginInstance::load(&descriptor, &entry, reporter)
        })
    }

    /// Run the optional per-type uninstall hook for every descriptor,
    /// best-effort.
    pub fn run_uninstall_hooks(&self, reporter: &dyn FaultReporter) {
        let entry = self
            .entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let Some(entry) = entry else { return };
        for descriptor in self.descriptors() {
            guarded_call(
                reporter,
                None,
                descriptor.name(),
                "uninstalling plugin",
                || entry.uninstall(descriptor.type_name()),
            );
        }
    }

    /// Drop the entry handle and every descriptor (icon caches included).
    /// A disposed record can no longer load plugins.
    pub fn dispose(&self) {
        let mut descriptors = self
            .descriptors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for descriptor in descriptors.values() {
            descriptor.clear_icons();
        }
        descriptors.clear();
        drop(descriptors);
        *self
            .entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Whether the record has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
            && !self.has_plugins()
    }
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("plugins", &self.descriptors().len())
            .finish()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Wires scanning to the shared registry and persisted state.
pub struct Catalog {
    provider: Arc<dyn ModuleProvider>,
    shared: Arc<SharedRuntime>,
    store: Arc<dyn StateStore>,
    reporter: Arc<dyn FaultReporter>,
}

impl Catalog {
    /// Build a catalog over the injected collaborators.
    pub fn new(
        provider: Arc<dyn ModuleProvider>,
        shared: Arc<SharedRuntime>,
        store: Arc<dyn StateStore>,
        reporter: Arc<dyn FaultReporter>,
    ) -> Self {
        Self {
            provider,
            shared,
            store,
            reporter,
        }
    }

    /// The shared registry this catalog populates.
    pub fn shared(&self) -> &Arc<SharedRuntime> {
        &self.shared
    }

    /// Scan one module path.
    pub fn scan_module(&self, path: &Path) -> Arc<ModuleRecord> {
        ModuleRecord::scan(path, self.provider.as_ref())
    }

    /// Restore persisted catalog state at process start: scan every
    /// persisted module path, apply the enabled-identifier list, load
    /// enabled static plugins, cache records that produced descriptors,
    /// then pull button order, shortcut keys and the advisory capability
    /// map into the shared registry.
    pub fn bootstrap(&self) {
        let enabled = self.store.enabled_plugin_ids();
        let mut cached = 0usize;
        for path in self.store.module_paths() {
            let record = self.scan_module(&path);
            if !record.has_plugins() {
                continue;
            }
            for descriptor in record.descriptors() {
                if !enabled.iter().any(|id| id == descriptor.id()) {
                    continue;
                }
                descriptor.set_enabled(true);
                record.set_enabled(true);
                if descriptor.kind() == PluginKind::Static {
                    load_static_plugin(
                        &self.shared,
                        self.reporter.as_ref(),
                        &descriptor,
                        &record,
                        false,
                    );
                }
            }
            self.shared.add_module(record);
            cached += 1;
        }

        self.shared
            .set_activated_buttons(self.store.load_button_order());
        self.shared.set_shortcut_keys(self.store.load_shortcut_keys());
        self.shared
            .set_known_capabilities(self.store.known_capabilities());

        info!(modules = cached, "plugin catalog restored");
    }

    /// Persist the module path list from the current cache contents,
    /// reindexed from zero.
    pub fn save_module_paths(&self) -> RuntimeResult<()> {
        let mut paths = self.shared.module_paths();
        paths.sort();
        self.store.save_module_paths(&paths)
    }

    /// Flip one plugin's enabled flag, recompute the owning module's flag,
    /// and persist the enabled-identifier list. Returns false when the
    /// identifier is unknown.
    pub fn set_plugin_enabled(&self, id: &str, enabled: bool) -> bool {
        let Some(descriptor) = self.shared.descriptor_for(id) else {
            return false;
        };
        descriptor.set_enabled(enabled);
        if let Some(record) = self.shared.module_for(descriptor.module_path()) {
            let any_enabled = record.descriptors().iter().any(|d| d.is_enabled());
            record.set_enabled(any_enabled);
        }

        let mut ids: Vec<String> = self
            .shared
            .plugin_descriptors()
            .into_iter()
            .filter(|d| d.is_enabled())
            .map(|d| d.id().to_string())
            .collect();
        ids.sort();
        if let Err(e) = self.store.save_enabled_plugin_ids(&ids) {
            warn!(error = %e, "failed to persist enabled plugin list");
        }
        true
    }

    /// Run the uninstall hooks and dispose the record.
    pub fn uninstall(&self, record: &ModuleRecord) {
        record.run_uninstall_hooks(self.reporter.as_ref());
        record.dispose();
    }
}

//! Plugin Descriptors
//!
//! A [`PluginDescriptor`] is the static metadata record for one discovered
//! plugin type. Identity fields are immutable after the scan; the enabled
//! flag, the cached icon pair, and the lazily learned shortcut-action names
//! sit behind interior mutability because descriptors are shared (`Arc`)
//! between the catalog, managers, and live instances.
//!
//! Identifiers are namespaced composites so two modules can ship the same
//! type name without colliding:
//! `"<title><version>(<path-hash>)" + "+" + "<type name>"`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tabweave_core::{IconData, PluginKind, PluginRegistration};

// ============================================================================
// Module Identity
// ============================================================================

/// Short hex hash of a module path (8 chars), the collision-avoidance part
/// of the module identity.
pub fn path_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Module identity string: `<title><version>(<path-hash>)`.
pub fn module_identity(title: &str, version: &str, path: &Path) -> String {
    format!("{}{}({})", title, version, path_hash(path))
}

/// Process-wide plugin identifier: `<module identity>+<type name>`.
pub fn plugin_id(module_name: &str, type_name: &str) -> String {
    format!("{}+{}", module_name, type_name)
}

// ============================================================================
// Icon Pair
// ============================================================================

/// Cached large/small icon images for one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconPair {
    /// Large toolbar icon
    pub large: Option<IconData>,
    /// Small toolbar icon
    pub small: Option<IconData>,
}

impl IconPair {
    /// Whether neither size is cached.
    pub fn is_empty(&self) -> bool {
        self.large.is_none() && self.small.is_none()
    }
}

// ============================================================================
// Plugin Descriptor
// ============================================================================

/// Static metadata for one discovered plugin type.
#[derive(Debug)]
pub struct PluginDescriptor {
    id: String,
    type_name: String,
    module_path: PathBuf,
    name: String,
    author: String,
    description: String,
    version: String,
    kind: PluginKind,
    enabled: AtomicBool,
    icons: Mutex<IconPair>,
    shortcut_actions: Mutex<Option<Vec<String>>>,
}

impl PluginDescriptor {
    /// Build a descriptor from a module registration. `module_name` is the
    /// owning module's identity string; `icons` is whatever the scan pulled
    /// from the module's resources.
    pub fn from_registration(
        registration: &PluginRegistration,
        module_name: &str,
        module_path: &Path,
        icons: IconPair,
    ) -> Self {
        Self {
            id: plugin_id(module_name, &registration.type_name),
            type_name: registration.type_name.clone(),
            module_path: module_path.to_path_buf(),
            name: registration.name.clone(),
            author: registration.author.clone(),
            description: registration.description.clone(),
            version: registration.version.clone(),
            kind: registration.kind,
            enabled: AtomicBool::new(false),
            icons: Mutex::new(icons),
            shortcut_actions: Mutex::new(None),
        }
    }

    /// Process-wide unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Module-unique type name the factory accepts.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Path of the owning module.
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin author.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Plugin version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Activation category.
    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Whether the plugin is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the enabled flag.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Snapshot of the cached icon pair.
    pub fn icons(&self) -> IconPair {
        self.icons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace cached icons with freshly probed ones. Sizes the probe did
    /// not return keep their cached image; replaced images are dropped.
    pub fn replace_icons(&self, large: Option<IconData>, small: Option<IconData>) {
        let mut icons = self
            .icons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if large.is_some() {
            icons.large = large;
        }
        if small.is_some() {
            icons.small = small;
        }
    }

    /// Drop both cached icons (module disposal).
    pub fn clear_icons(&self) {
        let mut icons = self
            .icons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *icons = IconPair::default();
    }

    /// Shortcut-action names, once the first open handshake reported them.
    pub fn shortcut_actions(&self) -> Option<Vec<String>> {
        self.shortcut_actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Record the action names reported by the open handshake.
    pub fn set_shortcut_actions(&self, actions: Vec<String>) {
        let mut slot = self
            .shortcut_actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(actions);
    }
}

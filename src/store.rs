//! Persisted Runtime State
//!
//! Loads and saves the catalog state that survives restarts: module paths,
//! enabled plugin identifiers, the advisory capability map, toolbar button
//! order, and shortcut key bindings. Files live under `~/.tabweave/` by
//! default; tests point the store at a scratch directory instead.
//!
//! Loads are infallible: a missing or malformed file logs a warning and
//! yields defaults, so one corrupt file never blocks startup.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RuntimeError, RuntimeResult};
use crate::shared::ActivatedButton;

const MODULES_FILE: &str = "modules.json";
const BUTTONS_FILE: &str = "buttons.json";
const SHORTCUTS_FILE: &str = "shortcuts.json";

// ============================================================================
// State Store contract
// ============================================================================

/// Persistence boundary for catalog state. The runtime only ever talks to
/// this trait; hosts may substitute their own backing store.
pub trait StateStore: Send + Sync {
    /// Persisted module paths, in persisted order.
    fn module_paths(&self) -> Vec<PathBuf>;

    /// Replace the persisted module path list.
    fn save_module_paths(&self, paths: &[PathBuf]) -> RuntimeResult<()>;

    /// Identifiers of plugins that were enabled when last saved.
    fn enabled_plugin_ids(&self) -> Vec<String>;

    /// Replace the persisted enabled-identifier list.
    fn save_enabled_plugin_ids(&self, ids: &[String]) -> RuntimeResult<()>;

    /// Advisory capability names per plugin identifier, as recorded by the
    /// host's configuration surface.
    fn known_capabilities(&self) -> HashMap<String, Vec<String>>;

    /// Persisted toolbar button order.
    fn load_button_order(&self) -> Vec<ActivatedButton>;

    /// Replace the persisted toolbar button order.
    fn save_button_order(&self, order: &[ActivatedButton]) -> RuntimeResult<()>;

    /// Shortcut bindings keyed by plugin identifier. Persisted as two
    /// parallel sequences; entries without a partner are ignored.
    fn load_shortcut_keys(&self) -> HashMap<String, Vec<i32>>;

    /// Replace the persisted shortcut bindings.
    fn save_shortcut_keys(&self, keys: &HashMap<String, Vec<i32>>) -> RuntimeResult<()>;
}

// ============================================================================
// JSON-backed store
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModulesFile {
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    enabled: Vec<String>,
    #[serde(default)]
    capabilities: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ButtonsFile {
    #[serde(default)]
    order: Vec<ActivatedButton>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ShortcutsFile {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    bindings: Vec<Vec<i32>>,
}

/// [`StateStore`] backed by JSON files under a root directory.
#[derive(Debug, Clone, Default)]
pub struct JsonStateStore {
    root: Option<PathBuf>,
}

impl JsonStateStore {
    /// Store rooted at `~/.tabweave`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rooted at `root` instead of the home directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn file_path(&self, name: &str) -> Option<PathBuf> {
        match &self.root {
            Some(root) => Some(root.join(name)),
            None => dirs::home_dir().map(|home| home.join(".tabweave").join(name)),
        }
    }

    fn load_json<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = match self.file_path(name) {
            Some(p) => p,
            None => return T::default(),
        };
        if !path.exists() {
            return T::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(file = %path.display(), error = %e, "ignoring malformed state file");
                T::default()
            }),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read state file");
                T::default()
            }
        }
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> RuntimeResult<()> {
        let path = self
            .file_path(name)
            .ok_or_else(|| RuntimeError::persistence("cannot determine home directory"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    fn module_paths(&self) -> Vec<PathBuf> {
        self.load_json::<ModulesFile>(MODULES_FILE)
            .paths
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn save_module_paths(&self, paths: &[PathBuf]) -> RuntimeResult<()> {
        // Read-modify-write keeps the enablement and capability sections.
        let mut file = self.load_json::<ModulesFile>(MODULES_FILE);
        file.paths = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.save_json(MODULES_FILE, &file)
    }

    fn enabled_plugin_ids(&self) -> Vec<String> {
        self.load_json::<ModulesFile>(MODULES_FILE).enabled
    }

    fn save_enabled_plugin_ids(&self, ids: &[String]) -> RuntimeResult<()> {
        let mut file = self.load_json::<ModulesFile>(MODULES_FILE);
        file.enabled = ids.to_vec();
        self.save_json(MODULES_FILE, &file)
    }

    fn known_capabilities(&self) -> HashMap<String, Vec<String>> {
        self.load_json::<ModulesFile>(MODULES_FILE).capabilities
    }

    fn load_button_order(&self) -> Vec<ActivatedButton> {
        self.load_json::<ButtonsFile>(BUTTONS_FILE).order
    }

    fn save_button_order(&self, order: &[ActivatedButton]) -> RuntimeResult<()> {
        let file = ButtonsFile {
            order: order.to_vec(),
        };
        self.save_json(BUTTONS_FILE, &file)
    }

    fn load_shortcut_keys(&self) -> HashMap<String, Vec<i32>> {
        let file = self.load_json::<ShortcutsFile>(SHORTCUTS_FILE);
        // zip drops whichever sequence runs longer
        file.ids.into_iter().zip(file.bindings).collect()
    }

    fn save_shortcut_keys(&self, keys: &HashMap<String, Vec<i32>>) -> RuntimeResult<()> {
        let mut ids: Vec<String> = keys.keys().cloned().collect();
        ids.sort();
        let bindings = ids
            .iter()
            .map(|id| keys.get(id).cloned().unwrap_or_default())
            .collect();
        let file = ShortcutsFile { ids, bindings };
        self.save_json(SHORTCUTS_FILE, &file)
    }
}

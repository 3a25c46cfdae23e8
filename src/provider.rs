//! In-Process Module Provider
//!
//! [`ModuleProvider`] backed by a registration table. Hosts that link
//! their plugin modules into the binary register one entry point per
//! nominal path; the catalog then resolves those paths exactly like any
//! other provider. Unregistered paths resolve to a not-found error, which
//! the scan turns into an inert record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tabweave_core::{CoreError, CoreResult, ModuleProvider, SharedModuleEntry};

/// Registration table mapping nominal module paths to entry points.
#[derive(Default)]
pub struct InProcessModules {
    entries: Mutex<HashMap<PathBuf, SharedModuleEntry>>,
}

impl InProcessModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `path`, replacing any previous registration.
    pub fn register(&self, path: impl Into<PathBuf>, entry: SharedModuleEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), entry);
    }

    /// Remove the registration under `path`; returns whether one existed.
    pub fn unregister(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
            .is_some()
    }

    /// Every registered path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl ModuleProvider for InProcessModules {
    fn resolve(&self, path: &Path) -> CoreResult<SharedModuleEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| {
                CoreError::not_found(format!("no module registered at {}", path.display()))
            })
    }
}

impl std::fmt::Debug for InProcessModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessModules")
            .field("registered", &self.paths().len())
            .finish()
    }
}

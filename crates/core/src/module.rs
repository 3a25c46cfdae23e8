//! Module Entry Contract
//!
//! A module is an on-disk unit of plugin code. Instead of runtime type
//! introspection, every module exposes one fixed entry point implementing
//! [`ModuleEntry`]: it reports the module's metadata, a manifest of plugin
//! registrations, a factory that constructs clients by type name, a resource
//! lookup for icon assets, and an optional per-type uninstall hook.
//!
//! How an entry point is obtained from a path is the host's business: a
//! [`ModuleProvider`] is injected into the catalog, so hosts can back it
//! with dynamic loading, a static link table, or test doubles.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;
use crate::client::{PluginKind, SharedClient};
use crate::error::CoreResult;

// ============================================================================
// Module Metadata & Registrations
// ============================================================================

/// Embedded metadata describing a module as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Human-readable module title
    #[serde(default)]
    pub title: String,
    /// Module author
    #[serde(default)]
    pub author: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Module version string
    #[serde(default)]
    pub version: String,
}

/// One plugin type a module registers.
///
/// The `type_name` is the module-unique key the factory accepts; the
/// runtime namespaces it with the module identity to form the process-wide
/// plugin identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRegistration {
    /// Module-unique type name (e.g. `"weather::ForecastButton"`)
    pub type_name: String,
    /// Display name
    pub name: String,
    /// Plugin author
    #[serde(default)]
    pub author: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Plugin version string
    #[serde(default)]
    pub version: String,
    /// Activation category
    pub kind: PluginKind,
}

impl PluginRegistration {
    /// Last path segment of the type name, used for resource lookups
    /// (`<TypeName>_large` / `<TypeName>_small`).
    pub fn short_type_name(&self) -> &str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.type_name)
    }
}

/// A constructed plugin: the client handle plus its capability set.
pub struct ConstructedPlugin {
    /// The live client
    pub client: SharedClient,
    /// Optional integration handles sharing state with the client
    pub capabilities: CapabilitySet,
}

impl ConstructedPlugin {
    /// A plugin with no extra capabilities.
    pub fn plain(client: SharedClient) -> Self {
        Self {
            client,
            capabilities: CapabilitySet::none(),
        }
    }

    /// A plugin with the given capability set.
    pub fn with_capabilities(client: SharedClient, capabilities: CapabilitySet) -> Self {
        Self {
            client,
            capabilities,
        }
    }
}

// ============================================================================
// Module Entry Point
// ============================================================================

/// The fixed entry point every module exposes.
pub trait ModuleEntry: Send + Sync {
    /// Module-level metadata.
    fn metadata(&self) -> ModuleMetadata;

    /// Manifest of every plugin type this module registers.
    fn registrations(&self) -> Vec<PluginRegistration>;

    /// Construct the plugin registered under `type_name`.
    fn create(&self, type_name: &str) -> CoreResult<ConstructedPlugin>;

    /// Look up an embedded resource by name (icon assets use the
    /// `<TypeName>_large` / `<TypeName>_small` convention). `None` when
    /// the module ships no such resource.
    fn resource(&self, name: &str) -> Option<crate::client::IconData> {
        let _ = name;
        None
    }

    /// One-time cleanup hook for the plugin type being uninstalled.
    /// Default is a no-op; failures are contained by the caller.
    fn uninstall(&self, type_name: &str) -> CoreResult<()> {
        let _ = type_name;
        Ok(())
    }
}

/// Shared handle to a resolved module entry point.
pub type SharedModuleEntry = Arc<dyn ModuleEntry>;

// ============================================================================
// Module Provider
// ============================================================================

/// Resolves a module path to its entry point.
///
/// Injected into the catalog; resolution failure (missing file, corrupt
/// binary, unresolved dependency) surfaces as an error the catalog logs at
/// module granularity.
pub trait ModuleProvider: Send + Sync {
    /// Resolve the module at `path`.
    fn resolve(&self, path: &Path) -> CoreResult<SharedModuleEntry>;
}

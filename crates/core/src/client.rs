//! Plugin Client Contract
//!
//! The traits and data types every TabWeave plugin implements or consumes.
//! A plugin type exports a [`PluginRegistration`](crate::module::PluginRegistration)
//! through its module entry point and hands back a [`PluginClient`] trait
//! object (plus an optional capability set) from the module factory.
//!
//! ## Key Types
//!
//! - `PluginKind` - the four activation categories the runtime distinguishes
//! - `EndCode` - why a plugin is being closed
//! - `IconData` - opaque icon bytes the host renders
//! - `PluginClient` - the minimal client surface the runtime itself calls

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

// ============================================================================
// Plugin Kind
// ============================================================================

/// Activation category of a plugin.
///
/// The kind governs when the runtime loads a plugin and which teardown
/// bucket it falls into when a host window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Loaded on demand when the host UI invokes it; never auto-loaded
    Interactive,
    /// Auto-loaded per window while enabled; may provide view filters
    Background,
    /// Auto-loaded per window while enabled; contributes multiple bar items
    BackgroundMultiple,
    /// Loaded once per process, independent of any window
    Static,
}

impl PluginKind {
    /// Stable lowercase name used in logs and persisted metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Interactive => "interactive",
            PluginKind::Background => "background",
            PluginKind::BackgroundMultiple => "background_multiple",
            PluginKind::Static => "static",
        }
    }

    /// Parse a kind from a string (accepts snake_case and kebab-case).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "interactive" => Some(Self::Interactive),
            "background" => Some(Self::Background),
            "background_multiple" | "background-multiple" => Some(Self::BackgroundMultiple),
            "static" => Some(Self::Static),
            _ => None,
        }
    }

    /// All four kind variants.
    pub fn all_variants() -> Vec<Self> {
        vec![
            Self::Interactive,
            Self::Background,
            Self::BackgroundMultiple,
            Self::Static,
        ]
    }

    /// Whether the runtime auto-loads this kind for each window at startup.
    pub fn auto_loads(&self) -> bool {
        matches!(self, Self::Background | Self::BackgroundMultiple)
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// End Code
// ============================================================================

/// Why a plugin instance is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCode {
    /// The owning host window is closing
    WindowClosed,
    /// The plugin was disabled or its module is being reloaded
    Unloaded,
    /// The plugin's module is being uninstalled
    Removed,
}

impl std::fmt::Display for EndCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndCode::WindowClosed => write!(f, "window_closed"),
            EndCode::Unloaded => write!(f, "unloaded"),
            EndCode::Removed => write!(f, "removed"),
        }
    }
}

// ============================================================================
// Icon Data
// ============================================================================

/// Opaque encoded icon bytes. The runtime caches and hands these to the
/// host; decoding and rendering are host concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconData {
    /// Encoded image bytes (typically PNG)
    pub bytes: Vec<u8>,
}

impl IconData {
    /// Wrap raw encoded bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Byte length of the encoded image.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the icon holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Plugin Client
// ============================================================================

/// The minimal surface the runtime calls on a live plugin.
///
/// Windowed plugins are opened through the host event dispatcher, which
/// hands them the full host context; the runtime itself only ever closes
/// clients, opens static plugins detached, and asks for shortcut action
/// names. Implementations use interior mutability for any state the open
/// and close transitions touch.
pub trait PluginClient: Send + Sync {
    /// Open outside any host window. Only static plugins are opened this
    /// way; windowed plugins go through the dispatcher's open handshake.
    fn open_detached(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Shut down with the given reason. Called at most once per instance;
    /// the runtime drops its reference afterwards.
    fn close(&self, code: EndCode);

    /// Names of the shortcut actions this plugin offers, in binding order.
    /// An empty list means the plugin has no bindable actions.
    fn shortcut_actions(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Shared handle to a live plugin client.
///
/// Client identity (used by menu registration and reverse lookup) is
/// pointer identity of this handle.
pub type SharedClient = Arc<dyn PluginClient>;

/// Whether two client handles refer to the same live plugin object.
pub fn same_client(a: &SharedClient, b: &SharedClient) -> bool {
    Arc::ptr_eq(a, b)
}

//! Optional Plugin Capabilities
//!
//! A plugin declares extra integration points by handing the runtime
//! explicit capability handles at construction time, collected in a
//! [`CapabilitySet`]. The runtime never probes a live object's type; a
//! capability either has a handle in the set or it does not.
//!
//! The handles share state with the plugin client: the usual pattern is a
//! single `Arc<MyPlugin>` where `MyPlugin` implements `PluginClient` plus
//! whichever capability traits apply, cloned into each slot.

use std::sync::Arc;

use crate::client::IconData;
use crate::error::CoreResult;

// ============================================================================
// Capability Traits
// ============================================================================

/// A single toolbar button contributed by a background plugin.
pub trait ToolbarButton: Send + Sync {
    /// Current icon for the requested size, or `None` to keep the cached
    /// catalog icon. Errors signal a broken capability and are treated as
    /// a failed load by the runtime.
    fn button_image(&self, large: bool) -> CoreResult<Option<IconData>>;

    /// The host pressed the button.
    fn on_click(&self) -> CoreResult<()>;
}

/// A custom control embedded in the host toolbar.
pub trait ToolbarCustomItem: Send + Sync {
    /// Pixel width the control wants for the given icon size mode.
    fn desired_width(&self, large: bool) -> u32;
}

/// Multiple named bar items contributed by one background-multiple plugin.
pub trait ToolbarMultiItems: Send + Sync {
    /// Number of items this plugin currently contributes.
    fn item_count(&self) -> usize;

    /// Display name of the item at `index`.
    fn item_name(&self, index: usize) -> String;

    /// The host pressed the item at `index`.
    fn on_item_click(&self, index: usize) -> CoreResult<()>;
}

/// Per-item view filtering for the host's file list.
pub trait ViewFilter: Send + Sync {
    /// Whether the entry with this display name stays visible.
    fn accepts(&self, name: &str) -> bool;
}

/// Batch view filtering, for plugins that need the whole listing at once.
pub trait ViewFilterCore: Send + Sync {
    /// Return the subset of `entries` that stays visible, order preserved.
    fn filter(&self, entries: Vec<String>) -> Vec<String>;
}

/// Text-encoding detection shared process-wide by static plugins.
pub trait EncodingDetector: Send + Sync {
    /// Best-guess encoding name for the given bytes, or `None` when
    /// undetermined.
    fn detect(&self, bytes: &[u8]) -> Option<String>;
}

// ============================================================================
// Capability Set
// ============================================================================

/// The optional capability handles one constructed plugin exposes.
///
/// Populated once by the module factory and captured by the runtime's
/// instance wrapper; an empty set is a plugin with no extra integration
/// points.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    /// Single toolbar button (background plugins)
    pub toolbar_button: Option<Arc<dyn ToolbarButton>>,
    /// Custom toolbar control (background plugins)
    pub custom_item: Option<Arc<dyn ToolbarCustomItem>>,
    /// Multiple named bar items (background-multiple plugins)
    pub multi_items: Option<Arc<dyn ToolbarMultiItems>>,
    /// Per-item view filter
    pub view_filter: Option<Arc<dyn ViewFilter>>,
    /// Batch view filter
    pub filter_core: Option<Arc<dyn ViewFilterCore>>,
    /// Shared encoding detector (static plugins)
    pub encoding_detector: Option<Arc<dyn EncodingDetector>>,
}

impl CapabilitySet {
    /// A set with no capabilities.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no capability handle is present at all.
    pub fn is_empty(&self) -> bool {
        self.toolbar_button.is_none()
            && self.custom_item.is_none()
            && self.multi_items.is_none()
            && self.view_filter.is_none()
            && self.filter_core.is_none()
            && self.encoding_detector.is_none()
    }

    /// Builder-style: attach a toolbar button handle.
    pub fn with_toolbar_button(mut self, handle: Arc<dyn ToolbarButton>) -> Self {
        self.toolbar_button = Some(handle);
        self
    }

    /// Builder-style: attach a custom toolbar item handle.
    pub fn with_custom_item(mut self, handle: Arc<dyn ToolbarCustomItem>) -> Self {
        self.custom_item = Some(handle);
        self
    }

    /// Builder-style: attach a multiple-items handle.
    pub fn with_multi_items(mut self, handle: Arc<dyn ToolbarMultiItems>) -> Self {
        self.multi_items = Some(handle);
        self
    }

    /// Builder-style: attach a view-filter handle.
    pub fn with_view_filter(mut self, handle: Arc<dyn ViewFilter>) -> Self {
        self.view_filter = Some(handle);
        self
    }

    /// Builder-style: attach a batch-filter handle.
    pub fn with_filter_core(mut self, handle: Arc<dyn ViewFilterCore>) -> Self {
        self.filter_core = Some(handle);
        self
    }

    /// Builder-style: attach an encoding-detector handle.
    pub fn with_encoding_detector(mut self, handle: Arc<dyn EncodingDetector>) -> Self {
        self.encoding_detector = Some(handle);
        self
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("toolbar_button", &self.toolbar_button.is_some())
            .field("custom_item", &self.custom_item.is_some())
            .field("multi_items", &self.multi_items.is_some())
            .field("view_filter", &self.view_filter.is_some())
            .field("filter_core", &self.filter_core.is_some())
            .field("encoding_detector", &self.encoding_detector.is_some())
            .finish()
    }
}

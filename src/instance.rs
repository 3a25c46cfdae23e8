//! Live Plugin Instances
//!
//! A [`PluginInstance`] wraps one constructed plugin client together with
//! its capability set and a shared reference to the owning descriptor. The
//! wrapper is deliberately terminal: after [`PluginInstance::close`] the
//! client reference is severed, the capability handles are dropped, and the
//! object can never be reused. Reloading an identifier always builds a new
//! instance.

use std::sync::Arc;

use tabweave_core::{
    CapabilitySet, CoreResult, EndCode, IconData, PluginKind, SharedClient, SharedModuleEntry,
};

use crate::descriptor::PluginDescriptor;
use crate::report::{guarded_call, FaultReporter};

/// A live plugin bound to exactly one descriptor.
pub struct PluginInstance {
    client: Option<SharedClient>,
    capabilities: CapabilitySet,
    descriptor: Option<Arc<PluginDescriptor>>,
    background_button_supported: bool,
    background_button_enabled: bool,
}

impl PluginInstance {
    /// Wrap a constructed client. Background-button support is fixed here:
    /// a background plugin exposing a single button or a custom item, or a
    /// background-multiple plugin exposing multiple items.
    pub fn new(
        client: SharedClient,
        capabilities: CapabilitySet,
        descriptor: Arc<PluginDescriptor>,
    ) -> Self {
        let kind = descriptor.kind();
        let background_button_supported = (kind == PluginKind::Background
            && (capabilities.toolbar_button.is_some() || capabilities.custom_item.is_some()))
            || (kind == PluginKind::BackgroundMultiple && capabilities.multi_items.is_some());
        Self {
            client: Some(client),
            capabilities,
            descriptor: Some(descriptor),
            background_button_supported,
            background_button_enabled: false,
        }
    }

    /// Construct the descriptor's plugin through the module entry point and
    /// wrap it.
    ///
    /// When the client exposes the single-button capability it is probed
    /// once for a live icon pair; successfully probed sizes replace the
    /// descriptor's cached icons (the stale cache is dropped). A probe
    /// failure is reported and then propagated, because it means the
    /// declared capability is broken; the module-level load converts that
    /// into an absent result.
    pub fn load(
        descriptor: &Arc<PluginDescriptor>,
        entry: &SharedModuleEntry,
        reporter: &dyn FaultReporter,
    ) -> CoreResult<Self> {
        let constructed = entry.create(descriptor.type_name())?;
        let instance = Self::new(
            constructed.client,
            constructed.capabilities,
            Arc::clone(descriptor),
        );

        if let Some(button) = &instance.capabilities.toolbar_button {
            match Self::probe_icons(button.as_ref()) {
                Ok((large, small)) => descriptor.replace_icons(large, small),
                Err(e) => {
                    reporter.report(&e, None, descriptor.name(), "getting image from plugin");
                    return Err(e);
                }
            }
        }
        Ok(instance)
    }

    fn probe_icons(
        button: &dyn tabweave_core::ToolbarButton,
    ) -> CoreResult<(Option<IconData>, Option<IconData>)> {
        let large = button.button_image(true)?;
        let small = button.button_image(false)?;
        Ok((large, small))
    }

    /// The live client handle, or `None` once closed.
    pub fn client(&self) -> Option<&SharedClient> {
        self.client.as_ref()
    }

    /// The capability handles captured at construction. Empty after close.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The owning descriptor, or `None` once closed.
    pub fn descriptor(&self) -> Option<&Arc<PluginDescriptor>> {
        self.descriptor.as_ref()
    }

    /// Whether the instance still holds a client.
    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    /// Whether the host UI may expose a background-button integration.
    pub fn background_button_supported(&self) -> bool {
        self.background_button_supported
    }

    /// Whether the background-button integration is currently enabled.
    pub fn background_button_enabled(&self) -> bool {
        self.background_button_supported && self.background_button_enabled
    }

    /// Enable/disable the background-button integration. Ignored while the
    /// integration is unsupported.
    pub fn set_background_button_enabled(&mut self, enabled: bool) {
        if self.background_button_supported {
            self.background_button_enabled = enabled;
        }
    }

    /// Shut the plugin down with the given reason and sever every handle.
    /// Faults from the plugin's close are contained; closing an already
    /// closed instance is a no-op.
    pub fn close(&mut self, code: EndCode, reporter: &dyn FaultReporter) {
        if let Some(client) = self.client.take() {
            let name = self
                .descriptor
                .as_ref()
                .map(|d| d.name().to_string())
                .unwrap_or_default();
            guarded_call(reporter, None, &name, "closing plugin", || {
                client.close(code);
                Ok(())
            });
        }
        self.capabilities = CapabilitySet::none();
        self.descriptor = None;
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("live", &self.is_live())
            .field(
                "descriptor",
                &self.descriptor.as_ref().map(|d| d.id().to_string()),
            )
            .field("background_button_supported", &self.background_button_supported)
            .field("background_button_enabled", &self.background_button_enabled)
            .finish()
    }
}

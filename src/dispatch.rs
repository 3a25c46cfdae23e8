//! Host Event Dispatcher Contract
//!
//! The dispatcher is the host-side component that owns plugin event
//! subscriptions. The [`PluginManager`](crate::manager::PluginManager)
//! drives it but does not own it: it performs the open handshake when an
//! instance loads, tears subscriptions down on unload, and forwards host
//! UI notifications verbatim. Every forwarding call is a pure
//! pass-through with no transformation or buffering on this side.

use tabweave_core::SharedClient;

// ============================================================================
// Event payloads
// ============================================================================

/// Host window state transitions forwarded to subscribed plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerAction {
    Activated,
    Deactivated,
    Minimized,
    Restored,
    Closing,
}

/// Which context-menu surface a plugin contribution targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    Bar,
    Tab,
    Both,
}

impl MenuTarget {
    /// Whether the target covers the button-bar menu surface.
    pub fn includes_bar(self) -> bool {
        matches!(self, MenuTarget::Bar | MenuTarget::Both)
    }

    /// Whether the target covers the tab menu surface.
    pub fn includes_tab(self) -> bool {
        matches!(self, MenuTarget::Tab | MenuTarget::Both)
    }
}

// ============================================================================
// Dispatcher contract
// ============================================================================

/// Host-side event hub the manager forwards into.
///
/// `open_plugin`, `remove_events` and `clear_events` are the subscription
/// lifecycle and must be implemented. The fan-out notifications default to
/// no-ops so a host only implements the events it actually surfaces.
pub trait EventDispatcher: Send + Sync {
    /// One-time handshake after an instance is registered. Returns whether
    /// the plugin takes shortcut actions, and the action names it declared.
    fn open_plugin(&self, client: &SharedClient) -> (bool, Vec<String>);

    /// Drop every subscription held for `client`.
    fn remove_events(&self, client: &SharedClient);

    /// Drop every subscription for every client.
    fn clear_events(&self);

    /// Whether any plugin currently subscribes to selection changes. Hosts
    /// use this to skip computing selection payloads nobody wants.
    fn selection_changed_attached(&self) -> bool {
        false
    }

    fn on_explorer_state_changed(&self, _action: ExplorerAction) {}

    fn on_menu_renderer_changed(&self) {}

    fn on_mouse_enter(&self) {}

    fn on_mouse_leave(&self) {}

    fn on_navigation_complete(&self, _index: i32, _id_list: &[u8], _path: &str) {}

    fn on_pointed_tab_changed(&self, _index: i32, _id_list: &[u8], _path: &str) {}

    fn on_selection_changed(&self, _index: i32, _id_list: &[u8], _path: &str) {}

    fn on_settings_changed(&self, _kind: i32) {}

    fn on_tab_added(&self, _index: i32, _id_list: &[u8], _path: &str) {}

    fn on_tab_changed(&self, _index: i32, _id_list: &[u8], _path: &str) {}

    fn on_tab_removed(&self, _index: i32, _id_list: &[u8], _path: &str) {}
}

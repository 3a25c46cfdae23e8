//! TabWeave Plugins - Plugin Runtime for the TabWeave File Manager
//!
//! This library implements the plugin subsystem embedded in the TabWeave
//! host application. It includes:
//! - Module discovery and cataloging (scan, enable/disable, uninstall)
//! - Per-window plugin lifecycle and event fan-out via the manager
//! - A process-wide shared registry for module caches, static plugin
//!   instances, button order and shortcut bindings
//! - Fault containment around every call into plugin code
//! - JSON persistence for the state that must survive restarts
//!
//! Plugin authors implement the contracts from [`tabweave_core`]; hosts
//! construct a [`SharedRuntime`], restore state through a [`Catalog`], and
//! hand each window its own [`PluginManager`].

pub mod catalog;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod manager;
pub mod provider;
pub mod report;
pub mod shared;
pub mod store;

// Re-export the contract crate so plugin authors and hosts need a single
// dependency root.
pub use tabweave_core;

// Catalog and identity
pub use catalog::{Catalog, ModuleRecord};
pub use descriptor::{module_identity, plugin_id, IconPair, PluginDescriptor};
// Runtime orchestration
pub use instance::PluginInstance;
pub use manager::PluginManager;
pub use shared::{ActivatedButton, SharedRuntime};
// Host integration surfaces
pub use dispatch::{EventDispatcher, ExplorerAction, MenuTarget};
pub use provider::InProcessModules;
pub use report::{guarded_call, ErrorLog, FaultReporter, LogReporter, WindowId};
pub use store::{JsonStateStore, StateStore};
// Errors
pub use error::{RuntimeError, RuntimeResult};

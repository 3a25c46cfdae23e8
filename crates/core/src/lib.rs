//! TabWeave Core
//!
//! Contract layer of the TabWeave plugin workspace: the traits a plugin
//! author implements, the data types the runtime and plugins exchange, and
//! the shared error types. This crate has zero dependencies on runtime-level
//! code (catalog, manager, persistence).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `client` - Plugin client contract (`PluginClient`, `PluginKind`, `EndCode`, `IconData`)
//! - `capability` - Optional capability traits and the `CapabilitySet` handle bundle
//! - `module` - Module entry contract (`ModuleEntry`, `ModuleProvider`, registrations)
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - plugin authors build fast
//! 2. **Trait-based seams** - every host-supplied piece is mockable
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod capability;
pub mod client;
pub mod error;
pub mod module;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Client Contract ────────────────────────────────────────────────────
pub use client::{same_client, EndCode, IconData, PluginClient, PluginKind, SharedClient};

// ── Capabilities ───────────────────────────────────────────────────────
pub use capability::{
    CapabilitySet, EncodingDetector, ToolbarButton, ToolbarCustomItem, ToolbarMultiItems,
    ViewFilter, ViewFilterCore,
};

// ── Module Contract ────────────────────────────────────────────────────
pub use module::{
    ConstructedPlugin, ModuleEntry, ModuleMetadata, ModuleProvider, PluginRegistration,
    SharedModuleEntry,
};

//! Shared Test Fixtures
//!
//! A fake plugin module ("toolkit") covering all four plugin kinds, a
//! module whose construction always fails, a recording dispatcher, a
//! counting fault reporter, and a `TestBed` that wires them to a real
//! catalog, shared runtime and JSON store rooted in a scratch directory.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use tabweave_plugins::tabweave_core::{
    CapabilitySet, ConstructedPlugin, CoreError, CoreResult, EncodingDetector, EndCode, IconData,
    ModuleEntry, ModuleMetadata, ModuleProvider, PluginClient, PluginKind, PluginRegistration,
    SharedClient, ToolbarButton, ToolbarMultiItems, ViewFilter, ViewFilterCore,
};
use tabweave_plugins::ExplorerAction;
use tabweave_plugins::{
    Catalog, EventDispatcher, FaultReporter, InProcessModules, JsonStateStore, ModuleRecord,
    PluginDescriptor, PluginManager, SharedRuntime, StateStore, WindowId,
};

pub const TOOLKIT_PATH: &str = "/modules/toolkit.twm";
pub const FLAKY_PATH: &str = "/modules/flaky.twm";

// ============================================================================
// Toolkit module: one plugin of every kind
// ============================================================================

/// Client that counts closes and records the close reasons it saw.
pub struct CountedClient {
    closes: Arc<AtomicUsize>,
    codes: Arc<Mutex<Vec<EndCode>>>,
}

impl PluginClient for CountedClient {
    fn close(&self, code: EndCode) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(code);
    }
}

struct DotfileFilter;

impl ViewFilter for DotfileFilter {
    fn accepts(&self, name: &str) -> bool {
        !name.starts_with('.')
    }
}

struct DotfileFilterCore;

impl ViewFilterCore for DotfileFilterCore {
    fn filter(&self, entries: Vec<String>) -> Vec<String> {
        entries
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .collect()
    }
}

struct BomDetector;

impl EncodingDetector for BomDetector {
    fn detect(&self, bytes: &[u8]) -> Option<String> {
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            Some("utf-8".to_string())
        } else {
            None
        }
    }
}

struct BadgeItems;

impl ToolbarMultiItems for BadgeItems {
    fn item_count(&self) -> usize {
        2
    }

    fn item_name(&self, index: usize) -> String {
        match index {
            0 => "Stars".to_string(),
            _ => "Tags".to_string(),
        }
    }

    fn on_item_click(&self, _index: usize) -> CoreResult<()> {
        Ok(())
    }
}

struct LiveIcon;

impl ToolbarButton for LiveIcon {
    fn button_image(&self, large: bool) -> CoreResult<Option<IconData>> {
        if large {
            Ok(Some(IconData::from_bytes(vec![0xBB, 0xBB])))
        } else {
            Ok(None)
        }
    }

    fn on_click(&self) -> CoreResult<()> {
        Ok(())
    }
}

/// Module entry exposing `Sweeper` (background, filters), `Inspector`
/// (interactive), `Badges` (background-multiple) and `Charset` (static,
/// encoding detector plus live toolbar icon).
pub struct ToolkitEntry {
    closes: Arc<AtomicUsize>,
    codes: Arc<Mutex<Vec<EndCode>>>,
}

impl ToolkitEntry {
    fn registration(type_name: &str, name: &str, kind: PluginKind) -> PluginRegistration {
        PluginRegistration {
            type_name: type_name.to_string(),
            name: name.to_string(),
            author: "TabWeave Tests".to_string(),
            description: String::new(),
            version: "1.2".to_string(),
            kind,
        }
    }

    fn client(&self) -> Arc<CountedClient> {
        Arc::new(CountedClient {
            closes: Arc::clone(&self.closes),
            codes: Arc::clone(&self.codes),
        })
    }
}

impl ModuleEntry for ToolkitEntry {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            title: "Toolkit".to_string(),
            author: "TabWeave Tests".to_string(),
            description: "Fixture module".to_string(),
            version: "1.2".to_string(),
        }
    }

    fn registrations(&self) -> Vec<PluginRegistration> {
        vec![
            Self::registration("toolkit::Sweeper", "Sweeper", PluginKind::Background),
            Self::registration("toolkit::Inspector", "Inspector", PluginKind::Interactive),
            Self::registration("toolkit::Badges", "Badges", PluginKind::BackgroundMultiple),
            Self::registration("toolkit::Charset", "Charset", PluginKind::Static),
        ]
    }

    fn create(&self, type_name: &str) -> CoreResult<ConstructedPlugin> {
        let client = self.client();
        match type_name {
            "toolkit::Sweeper" => Ok(ConstructedPlugin::with_capabilities(
                client,
                CapabilitySet::none()
                    .with_view_filter(Arc::new(DotfileFilter))
                    .with_filter_core(Arc::new(DotfileFilterCore)),
            )),
            "toolkit::Inspector" => Ok(ConstructedPlugin::plain(client)),
            "toolkit::Badges" => Ok(ConstructedPlugin::with_capabilities(
                client,
                CapabilitySet::none().with_multi_items(Arc::new(BadgeItems)),
            )),
            "toolkit::Charset" => Ok(ConstructedPlugin::with_capabilities(
                client,
                CapabilitySet::none()
                    .with_encoding_detector(Arc::new(BomDetector))
                    .with_toolbar_button(Arc::new(LiveIcon)),
            )),
            other => Err(CoreError::not_found(format!("no factory: {}", other))),
        }
    }

    fn resource(&self, name: &str) -> Option<IconData> {
        if name == "Inspector_large" {
            Some(IconData::from_bytes(vec![0x1C]))
        } else {
            None
        }
    }
}

/// Module whose only plugin fails to construct.
pub struct FlakyEntry;

impl ModuleEntry for FlakyEntry {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            title: "Flaky".to_string(),
            author: String::new(),
            description: String::new(),
            version: "0.1".to_string(),
        }
    }

    fn registrations(&self) -> Vec<PluginRegistration> {
        vec![PluginRegistration {
            type_name: "flaky::Crashes".to_string(),
            name: "Crashes".to_string(),
            author: String::new(),
            description: String::new(),
            version: "0.1".to_string(),
            kind: PluginKind::Background,
        }]
    }

    fn create(&self, _type_name: &str) -> CoreResult<ConstructedPlugin> {
        Err(CoreError::internal("construction exploded"))
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Dispatcher that counts subscription calls and logs fan-out events.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub opens: AtomicUsize,
    pub removes: AtomicUsize,
    pub clears: AtomicUsize,
    pub selection_attached: AtomicBool,
    actions: Mutex<Vec<String>>,
    events: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    pub fn with_actions(actions: &[&str]) -> Self {
        Self {
            actions: Mutex::new(actions.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn event_log(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn open_plugin(&self, _client: &SharedClient) -> (bool, Vec<String>) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        (true, self.actions.lock().unwrap().clone())
    }

    fn remove_events(&self, _client: &SharedClient) {
        self.removes.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_events(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn selection_changed_attached(&self) -> bool {
        self.selection_attached.load(Ordering::SeqCst)
    }

    fn on_explorer_state_changed(&self, action: ExplorerAction) {
        self.events.lock().unwrap().push(format!("state:{:?}", action));
    }

    fn on_navigation_complete(&self, index: i32, _id_list: &[u8], path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("navigation:{}:{}", index, path));
    }

    fn on_settings_changed(&self, kind: i32) {
        self.events.lock().unwrap().push(format!("settings:{}", kind));
    }

    fn on_tab_added(&self, index: i32, _id_list: &[u8], path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("tab-added:{}:{}", index, path));
    }
}

/// Reporter that records `(plugin, phase)` pairs.
#[derive(Default)]
pub struct CountingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl CountingReporter {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn phases(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, phase)| phase.clone())
            .collect()
    }
}

impl FaultReporter for CountingReporter {
    fn report(&self, _error: &CoreError, _window: Option<WindowId>, plugin: &str, phase: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((plugin.to_string(), phase.to_string()));
    }
}

// ============================================================================
// Test bed
// ============================================================================

/// Real runtime collaborators over fake modules and a scratch store.
pub struct TestBed {
    pub provider: Arc<InProcessModules>,
    pub shared: Arc<SharedRuntime>,
    pub store: Arc<JsonStateStore>,
    pub reporter: Arc<CountingReporter>,
    closes: Arc<AtomicUsize>,
    codes: Arc<Mutex<Vec<EndCode>>>,
    pub dir: TempDir,
}

impl TestBed {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let closes = Arc::new(AtomicUsize::new(0));
        let codes = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(InProcessModules::new());
        provider.register(
            TOOLKIT_PATH,
            Arc::new(ToolkitEntry {
                closes: Arc::clone(&closes),
                codes: Arc::clone(&codes),
            }),
        );
        provider.register(FLAKY_PATH, Arc::new(FlakyEntry));

        Self {
            provider,
            shared: Arc::new(SharedRuntime::new()),
            store: Arc::new(JsonStateStore::with_root(dir.path())),
            reporter: Arc::new(CountingReporter::default()),
            closes,
            codes,
            dir,
        }
    }

    /// Register a second toolkit module under `path`, sharing the same
    /// close counters.
    pub fn register_toolkit_at(&self, path: &str) {
        self.provider.register(
            path,
            Arc::new(ToolkitEntry {
                closes: Arc::clone(&self.closes),
                codes: Arc::clone(&self.codes),
            }),
        );
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            Arc::clone(&self.provider) as Arc<dyn ModuleProvider>,
            Arc::clone(&self.shared),
            Arc::clone(&self.store) as Arc<dyn StateStore>,
            Arc::clone(&self.reporter) as Arc<dyn FaultReporter>,
        )
    }

    pub fn scan_toolkit(&self) -> Arc<ModuleRecord> {
        self.catalog().scan_module(Path::new(TOOLKIT_PATH))
    }

    pub fn manager<D: EventDispatcher + 'static>(&self, dispatcher: Arc<D>) -> PluginManager {
        PluginManager::new(
            Arc::clone(&self.shared),
            dispatcher,
            Arc::clone(&self.store) as Arc<dyn StateStore>,
            Arc::clone(&self.reporter) as Arc<dyn FaultReporter>,
        )
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn close_codes(&self) -> Vec<EndCode> {
        self.codes.lock().unwrap().clone()
    }
}

/// Descriptor with the given type name, or panic.
pub fn descriptor_named(record: &ModuleRecord, type_name: &str) -> Arc<PluginDescriptor> {
    record
        .descriptors()
        .into_iter()
        .find(|d| d.type_name() == type_name)
        .unwrap_or_else(|| panic!("no descriptor for {}", type_name))
}

/// Enable every plugin in the record, module flag included.
pub fn enable_all(record: &ModuleRecord) {
    for descriptor in record.descriptors() {
        descriptor.set_enabled(true);
    }
    record.set_enabled(true);
}

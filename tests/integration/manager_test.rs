//! Manager Integration Tests
//!
//! Window-level flows against real catalog records: startup admission by
//! plugin kind, containment of failing loads, on-demand interactive
//! loading with menu contributions, module refresh, and host event
//! fan-out.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tabweave_plugins::tabweave_core::EndCode;
use tabweave_plugins::{ExplorerAction, MenuTarget};

use crate::support::{descriptor_named, enable_all, RecordingDispatcher, TestBed, FLAKY_PATH};

#[test]
fn test_window_startup_loads_enabled_background_kinds() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let manager = bed.manager(Arc::clone(&dispatcher));

    let sweeper = descriptor_named(&record, "toolkit::Sweeper");
    let badges = descriptor_named(&record, "toolkit::Badges");
    let inspector = descriptor_named(&record, "toolkit::Inspector");
    let charset = descriptor_named(&record, "toolkit::Charset");

    assert!(manager.is_loaded(sweeper.id()));
    assert!(manager.is_loaded(badges.id()));
    assert!(!manager.is_loaded(inspector.id()));
    assert!(!manager.is_loaded(charset.id()));
    assert_eq!(manager.instances().count(), 2);
    assert_eq!(dispatcher.opens.load(Ordering::SeqCst), 2);

    // The background plugin's filters were adopted and actually filter.
    assert!(!manager.view_filter().unwrap().accepts(".git"));
    assert_eq!(
        manager.filter_core().unwrap().filter(vec![
            ".hidden".to_string(),
            "readme.md".to_string(),
        ]),
        vec!["readme.md".to_string()]
    );

    // Bar integration support follows kind and capabilities.
    assert!(manager
        .instance(badges.id())
        .unwrap()
        .background_button_supported());
    assert!(!manager
        .instance(sweeper.id())
        .unwrap()
        .background_button_supported());
}

#[test]
fn test_failed_background_load_reports_and_disables() {
    let bed = TestBed::new();
    let record = bed.catalog().scan_module(Path::new(FLAKY_PATH));
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));

    let mut manager = bed.manager(Arc::new(RecordingDispatcher::default()));
    let crashes = descriptor_named(&record, "flaky::Crashes");

    assert!(!manager.is_loaded(crashes.id()));
    assert!(!crashes.is_enabled());
    assert_eq!(bed.reporter.count(), 1);
    assert!(bed.reporter.phases().contains(&"loading plugin".to_string()));

    // An explicit load attempt fails the same contained way.
    assert!(manager.load(&crashes, Some(&record)).is_none());
    assert_eq!(bed.reporter.count(), 2);
}

#[test]
fn test_interactive_loads_on_demand_and_contributes_menus() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut manager = bed.manager(Arc::clone(&dispatcher));
    let inspector = descriptor_named(&record, "toolkit::Inspector");

    // Module record resolved through the shared cache.
    assert!(manager.load(&inspector, None).is_some());
    assert_eq!(dispatcher.opens.load(Ordering::SeqCst), 3);
    let client = manager
        .instance(inspector.id())
        .and_then(|i| i.client())
        .cloned()
        .unwrap();

    manager.register_menu(&client, MenuTarget::Both, "Inspect", true);
    assert_eq!(
        manager.bar_menu_entries(),
        vec![(inspector.id().to_string(), "Inspect".to_string())]
    );
    assert_eq!(
        manager.tab_menu_entries(),
        vec![(inspector.id().to_string(), "Inspect".to_string())]
    );
    assert_eq!(
        manager.identify_client(&client, false),
        Some(inspector.id().to_string())
    );

    manager.unload_instance(inspector.id(), EndCode::Unloaded, false);
    assert!(!manager.is_loaded(inspector.id()));
    assert!(manager.bar_menu_entries().is_empty());
    assert!(manager.tab_menu_entries().is_empty());
    assert_eq!(dispatcher.removes.load(Ordering::SeqCst), 1);
    assert_eq!(bed.close_count(), 1);
    assert_eq!(bed.close_codes(), vec![EndCode::Unloaded]);
}

#[test]
fn test_refresh_module_reconciles_enablement_and_statics() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut manager = bed.manager(Arc::clone(&dispatcher));
    let sweeper = descriptor_named(&record, "toolkit::Sweeper");
    let badges = descriptor_named(&record, "toolkit::Badges");
    let charset = descriptor_named(&record, "toolkit::Charset");
    assert!(!bed.shared.has_static(charset.id()));

    sweeper.set_enabled(false);
    manager.refresh_module(&record, true);

    assert!(!manager.is_loaded(sweeper.id()));
    assert!(manager.is_loaded(badges.id()));
    assert_eq!(bed.close_count(), 1);

    // The enabled static came up without a window handshake.
    assert!(bed.shared.has_static(charset.id()));
    assert!(bed.shared.encoding_detector().is_some());
    assert_eq!(dispatcher.opens.load(Ordering::SeqCst), 2);

    // Disabling the static tears its shared instance down; the adopted
    // detector stays until another plugin replaces it.
    charset.set_enabled(false);
    manager.refresh_module(&record, true);
    assert!(!bed.shared.has_static(charset.id()));
    assert_eq!(bed.close_count(), 2);
    assert!(bed.shared.encoding_detector().is_some());
}

#[test]
fn test_event_fan_out_stops_after_dispatcher_release() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(record);

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut manager = bed.manager(Arc::clone(&dispatcher));

    manager.on_navigation_complete(3, &[0x14, 0x00], "/home/kai");
    manager.on_settings_changed(7);
    manager.on_tab_added(1, &[], "/tmp");
    manager.on_explorer_state_changed(ExplorerAction::Closing);
    assert_eq!(
        dispatcher.event_log(),
        vec![
            "navigation:3:/home/kai".to_string(),
            "settings:7".to_string(),
            "tab-added:1:/tmp".to_string(),
            "state:Closing".to_string(),
        ]
    );

    // Full teardown releases the dispatcher handle; fan-out goes inert.
    manager.close(false);
    manager.on_settings_changed(8);
    manager.on_tab_added(2, &[], "/var");
    assert_eq!(dispatcher.event_log().len(), 4);
}

#[test]
fn test_selection_subscription_reflects_dispatcher() {
    let bed = TestBed::new();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let manager = bed.manager(Arc::clone(&dispatcher));

    assert!(!manager.selection_change_attached());
    dispatcher.selection_attached.store(true, Ordering::SeqCst);
    assert!(manager.selection_change_attached());
}

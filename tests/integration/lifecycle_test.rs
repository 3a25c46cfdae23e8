//! Lifecycle Integration Tests
//!
//! Properties that span windows and the whole process: the shared module
//! cache outliving individual windows, statics loading once per process,
//! terminal closed instances, and handshake faults leaving the instance
//! registered.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tabweave_plugins::tabweave_core::{same_client, EndCode, IconData, SharedClient};
use tabweave_plugins::{EventDispatcher, StateStore};

use crate::support::{descriptor_named, enable_all, RecordingDispatcher, TestBed, TOOLKIT_PATH};

#[test]
fn test_module_cache_outlives_individual_windows() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));
    let sweeper = descriptor_named(&record, "toolkit::Sweeper");

    let mut first = bed.manager(Arc::new(RecordingDispatcher::default()));
    let mut second = bed.manager(Arc::new(RecordingDispatcher::default()));
    assert_eq!(bed.shared.attachment_count(), 2);

    // Each window constructed its own instance of the same plugin.
    let c1 = first
        .instance(sweeper.id())
        .and_then(|i| i.client())
        .cloned()
        .unwrap();
    let c2 = second
        .instance(sweeper.id())
        .and_then(|i| i.client())
        .cloned()
        .unwrap();
    assert!(!same_client(&c1, &c2));

    first.close(false);
    assert_eq!(bed.shared.attachment_count(), 1);
    assert_eq!(bed.close_count(), 2);

    // The surviving window and the shared cache are untouched.
    assert_eq!(bed.shared.modules().len(), 1);
    assert!(second.instance(sweeper.id()).unwrap().is_live());

    second.close(false);
    assert_eq!(bed.shared.attachment_count(), 0);
    assert_eq!(bed.close_count(), 4);
    assert_eq!(bed.shared.modules().len(), 1);
}

#[test]
fn test_static_loads_once_for_the_whole_process() {
    let bed = TestBed::new();
    let probe = bed.scan_toolkit();
    let sweeper = descriptor_named(&probe, "toolkit::Sweeper").id().to_string();
    let charset = descriptor_named(&probe, "toolkit::Charset").id().to_string();
    bed.store
        .save_module_paths(&[PathBuf::from(TOOLKIT_PATH)])
        .unwrap();
    bed.store
        .save_enabled_plugin_ids(&[sweeper.clone(), charset.clone()])
        .unwrap();

    bed.catalog().bootstrap();
    assert_eq!(bed.shared.static_count(), 1);
    assert_eq!(bed.shared.with_static(&charset, |i| i.is_live()), Some(true));

    // The live icon probe replaced the (absent) scan-cache icon.
    let descriptor = bed.shared.descriptor_for(&charset).unwrap();
    assert_eq!(
        descriptor.icons().large,
        Some(IconData::from_bytes(vec![0xBB, 0xBB]))
    );
    assert!(descriptor.icons().small.is_none());

    // Window managers come and go without touching the static.
    let mut first = bed.manager(Arc::new(RecordingDispatcher::default()));
    let mut second = bed.manager(Arc::new(RecordingDispatcher::default()));
    assert_eq!(bed.shared.static_count(), 1);

    first.close(false);
    second.close(false);
    assert_eq!(bed.shared.attachment_count(), 0);
    assert_eq!(bed.shared.static_count(), 1);
    assert_eq!(bed.shared.with_static(&charset, |i| i.is_live()), Some(true));
    let detector = bed.shared.encoding_detector().unwrap();
    assert_eq!(detector.detect(&[0xEF, 0xBB, 0xBF]), Some("utf-8".to_string()));
}

#[test]
fn test_closed_interactive_slot_is_terminal_until_reload() {
    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));
    let inspector = descriptor_named(&record, "toolkit::Inspector");

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut manager = bed.manager(Arc::clone(&dispatcher));
    manager.add_ref();
    assert_eq!(bed.shared.attachment_count(), 2);
    assert!(manager.load(&inspector, None).is_some());

    // Interactive teardown closes only that bucket and keeps the slot.
    manager.close(true);
    assert_eq!(bed.close_count(), 1);
    assert!(manager.is_loaded(inspector.id()));
    assert!(!manager.instance(inspector.id()).unwrap().is_live());
    assert!(manager.view_filter().is_some());
    assert_eq!(dispatcher.clears.load(Ordering::SeqCst), 1);

    // A closed slot never comes back to life; reloading replaces it.
    assert!(manager.load(&inspector, None).is_some());
    assert!(manager.instance(inspector.id()).unwrap().is_live());
    assert_eq!(bed.close_count(), 1);

    // Final close tears down the background bucket and empties the map.
    manager.close(false);
    assert_eq!(bed.close_count(), 3);
    assert!(!manager.is_loaded(inspector.id()));
    assert_eq!(dispatcher.clears.load(Ordering::SeqCst), 1);
    assert_eq!(bed.shared.attachment_count(), 0);
    assert_eq!(bed.close_codes().len(), 3);
    assert!(bed
        .close_codes()
        .iter()
        .all(|code| *code == EndCode::WindowClosed));
}

#[test]
fn test_handshake_fault_leaves_instance_registered_but_disabled() {
    struct PanickyDispatcher;

    impl EventDispatcher for PanickyDispatcher {
        fn open_plugin(&self, _client: &SharedClient) -> (bool, Vec<String>) {
            panic!("handshake exploded");
        }

        fn remove_events(&self, _client: &SharedClient) {}

        fn clear_events(&self) {}
    }

    let bed = TestBed::new();
    let record = bed.scan_toolkit();
    enable_all(&record);
    bed.shared.add_module(Arc::clone(&record));
    let sweeper = descriptor_named(&record, "toolkit::Sweeper");
    let badges = descriptor_named(&record, "toolkit::Badges");

    let manager = bed.manager(Arc::new(PanickyDispatcher));

    // The instance was registered before the handshake, so the fault
    // leaves it live in the map while the startup pass disables the
    // descriptor.
    assert!(manager.is_loaded(sweeper.id()));
    assert!(manager.instance(sweeper.id()).unwrap().is_live());
    assert!(!sweeper.is_enabled());
    assert!(!badges.is_enabled());
    assert_eq!(bed.reporter.count(), 2);
    assert_eq!(bed.close_count(), 0);
}

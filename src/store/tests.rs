use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::*;

const EDITOR: &str = "C:\\Program Files\\Editor\\editor.exe";
const TERMINAL: &str = "C:\\Windows\\System32\\terminal.exe";
const LAYOUT: &str = "{A1B2C3D4-0000-0000-0000-000000000001}";
const OTHER_LAYOUT: &str = "{A1B2C3D4-0000-0000-0000-000000000002}";

#[derive(Default)]
struct FakeResolver {
    windows: Mutex<HashMap<WindowHandle, (String, u32)>>,
    closed: Mutex<HashSet<WindowHandle>>,
}

impl FakeResolver {
    fn window(&self, handle: WindowHandle, path: &str, pid: u32) -> WindowHandle {
        self.windows.lock().insert(handle, (path.to_string(), pid));
        handle
    }

    fn close(&self, handle: WindowHandle) {
        self.closed.lock().insert(handle);
    }
}

impl WindowResolver for FakeResolver {
    fn process_path(&self, window: WindowHandle) -> Option<String> {
        self.windows.lock().get(&window).map(|(path, _)| path.clone())
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        self.windows.lock().get(&window).map(|(_, pid)| *pid)
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.windows.lock().contains_key(&window) && !self.closed.lock().contains(&window)
    }
}

fn store() -> (ZoneStore, Arc<FakeResolver>) {
    let resolver = Arc::new(FakeResolver::default());
    (ZoneStore::new(resolver.clone()), resolver)
}

fn desktop(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn device_on(n: u128) -> DeviceId {
    DeviceId::new("DELA026#5&10a58c63&0&UID16777488", 1920, 1080, desktop(n))
}

fn scratch_paths() -> (PathBuf, StorePaths) {
    let dir = std::env::temp_dir().join(format!("snapzones-store-{}", Uuid::new_v4()));
    let paths = StorePaths::in_dir(&dir);
    (dir, paths)
}

// ============================================================================
// Devices and layouts
// ============================================================================

#[test]
fn added_device_gets_defaults() {
    let (store, _) = store();
    let device = device_on(1);

    assert!(store.find_device(&device).is_none());
    assert!(store.add_device(&device));
    assert!(!store.add_device(&device));

    assert_eq!(store.find_device(&device), Some(DeviceInfo::default()));
    assert_eq!(store.device_ids(), vec![device]);
}

#[test]
fn activate_zone_set_updates_known_devices_only() {
    let (store, _) = store();
    let device = device_on(1);
    let grid = ZoneSetData::new(LAYOUT, LayoutType::Grid);

    assert!(!store.activate_zone_set(&device, grid.clone()));
    assert!(store.find_device(&device).is_none());

    store.add_device(&device);
    assert!(store.activate_zone_set(&device, grid.clone()));
    assert!(store.activate_zone_set(&device, grid.clone()));
    assert_eq!(store.find_device(&device).unwrap().active_zone_set, grid);
}

#[test]
fn clone_device_info_copies_the_record() {
    let (store, _) = store();
    let source = device_on(1);
    let destination = device_on(2);
    store.add_device(&source);
    store.activate_zone_set(&source, ZoneSetData::new(LAYOUT, LayoutType::Rows));

    store.clone_device_info(&source, &destination);
    store.clone_device_info(&device_on(9), &device_on(10));

    assert_eq!(store.find_device(&destination), store.find_device(&source));
    assert!(store.find_device(&device_on(10)).is_none());
}

#[test]
fn custom_zone_sets_are_found_by_uuid() {
    let (store, _) = store();
    let set = CustomZoneSet::new(
        LAYOUT,
        "Wide left",
        CustomLayout::Grid(GridLayout {
            rows: 1,
            columns: 2,
            rows_percentage: vec![10_000],
            columns_percentage: vec![6_000, 4_000],
            cell_child_map: vec![vec![0, 1]],
        }),
    );

    store.set_custom_zone_set(set.clone());

    assert_eq!(store.find_custom_zone_set(LAYOUT), Some(set));
    assert!(store.find_custom_zone_set(OTHER_LAYOUT).is_none());
}

#[test]
fn primary_desktop_data_moves_legacy_records() {
    let (store, resolver) = store();
    let legacy = device_on(0);
    let window = resolver.window(0x10, EDITOR, 7);
    store.add_device(&legacy);
    store.assign_zones(window, &legacy, LAYOUT, &[1]);

    store.update_primary_desktop_data(desktop(5));

    let moved = device_on(5);
    assert!(store.find_device(&legacy).is_none());
    assert!(store.find_device(&moved).is_some());
    assert_eq!(store.last_zones(window, &moved, LAYOUT), vec![1]);
    assert!(store.last_zones(window, &legacy, LAYOUT).is_empty());
}

#[test]
fn prune_with_no_active_desktops_removes_everything() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    for n in 1..=3 {
        store.add_device(&device_on(n));
        store.assign_zones(window, &device_on(n), LAYOUT, &[0]);
    }

    store.prune_desktops(&[]);

    assert!(store.device_ids().is_empty());
    assert!(store.app_zone_history(EDITOR).is_empty());
}

#[test]
fn prune_keeps_active_desktops() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    for n in 1..=3 {
        store.add_device(&device_on(n));
        store.assign_zones(window, &device_on(n), LAYOUT, &[0]);
    }

    store.prune_desktops(&[desktop(1), desktop(2), desktop(3)]);
    assert_eq!(store.device_ids().len(), 3);

    store.prune_desktops(&[desktop(2)]);
    assert_eq!(store.device_ids(), vec![device_on(2)]);
    let history = store.app_zone_history(EDITOR);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].device_id, device_on(2));
}

// ============================================================================
// Zone history
// ============================================================================

#[test]
fn missing_history_is_empty() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);

    assert!(store.last_zones(window, &device_on(1), LAYOUT).is_empty());
    assert!(store.last_zones(0xDEAD, &device_on(1), LAYOUT).is_empty());
}

#[test]
fn assigned_zones_are_returned_per_layout() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    let device = device_on(1);

    assert!(store.assign_zones(window, &device, LAYOUT, &[0, 2]));

    assert_eq!(store.last_zones(window, &device, LAYOUT), vec![0, 2]);
    assert!(store.last_zones(window, &device, OTHER_LAYOUT).is_empty());
    assert!(store.last_zones(window, &device_on(2), LAYOUT).is_empty());
}

#[test]
fn reassigning_overwrites_layout_and_indices() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    let device = device_on(1);

    store.assign_zones(window, &device, LAYOUT, &[0]);
    store.assign_zones(window, &device, OTHER_LAYOUT, &[3]);

    assert!(store.last_zones(window, &device, LAYOUT).is_empty());
    assert_eq!(store.last_zones(window, &device, OTHER_LAYOUT), vec![3]);
    assert_eq!(store.app_zone_history(EDITOR).len(), 1);
}

#[test]
fn windows_without_an_application_are_not_assigned() {
    let (store, resolver) = store();
    let nameless = resolver.window(0x10, "", 7);

    assert!(!store.assign_zones(nameless, &device_on(1), LAYOUT, &[0]));
    assert!(!store.assign_zones(0xDEAD, &device_on(1), LAYOUT, &[0]));
}

#[test]
fn second_live_window_of_an_instance_is_refused() {
    let (store, resolver) = store();
    let first = resolver.window(0x10, EDITOR, 7);
    let second = resolver.window(0x11, EDITOR, 7);
    let other_instance = resolver.window(0x12, EDITOR, 8);
    let device = device_on(1);

    assert!(store.assign_zones(first, &device, LAYOUT, &[0]));
    assert!(store.is_another_window_of_app_zoned(second, &device));
    assert!(!store.is_another_window_of_app_zoned(first, &device));
    assert!(!store.assign_zones(second, &device, LAYOUT, &[1]));
    assert!(store.assign_zones(other_instance, &device, LAYOUT, &[1]));

    // Once the first window is gone its slot can be taken
    resolver.close(first);
    assert!(!store.is_another_window_of_app_zoned(second, &device));
    assert!(store.assign_zones(second, &device, LAYOUT, &[2]));
    assert_eq!(store.last_zones(second, &device, LAYOUT), vec![2]);
}

#[test]
fn process_map_update_records_the_window() {
    let (store, resolver) = store();
    let first = resolver.window(0x10, EDITOR, 7);
    let second = resolver.window(0x11, EDITOR, 7);
    let device = device_on(1);
    store.assign_zones(first, &device, LAYOUT, &[0]);

    store.update_process_id_to_handle_map(second, &device);

    assert_eq!(
        store.app_zone_history(EDITOR)[0].process_id_to_handle.get(&7),
        Some(&second)
    );
    assert!(store.is_another_window_of_app_zoned(first, &device));
}

#[test]
fn removing_missing_history_returns_false() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    let device = device_on(1);

    assert!(!store.remove_zones(window, &device, LAYOUT));

    store.assign_zones(window, &device, LAYOUT, &[0]);
    assert!(!store.remove_zones(window, &device, OTHER_LAYOUT));
    assert!(!store.remove_zones(window, &device_on(2), LAYOUT));
}

#[test]
fn remove_drops_entry_when_last_window_leaves() {
    let (store, resolver) = store();
    let window = resolver.window(0x10, EDITOR, 7);
    let device = device_on(1);
    store.assign_zones(window, &device, LAYOUT, &[0]);

    assert!(store.remove_zones(window, &device, LAYOUT));

    assert!(store.last_zones(window, &device, LAYOUT).is_empty());
    assert!(store.app_zone_history(EDITOR).is_empty());
    assert!(!store.remove_zones(window, &device, LAYOUT));
}

#[test]
fn remove_keeps_entry_for_other_instances() {
    let (store, resolver) = store();
    let a = resolver.window(0x10, EDITOR, 7);
    let b = resolver.window(0x20, EDITOR, 8);
    let device = device_on(1);
    store.assign_zones(a, &device, LAYOUT, &[0]);
    store.assign_zones(b, &device, LAYOUT, &[0]);

    assert!(store.remove_zones(a, &device, LAYOUT));

    let history = store.app_zone_history(EDITOR);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].process_id_to_handle.len(), 1);
    assert_eq!(store.last_zones(b, &device, LAYOUT), vec![0]);
}

#[test]
fn concurrent_assignments_are_all_recorded() {
    let (store, resolver) = store();
    let store = Arc::new(store);
    let device = device_on(1);

    let handles: Vec<_> = (0..2u32)
        .map(|t| {
            let store = store.clone();
            let resolver = resolver.clone();
            let device = device.clone();
            std::thread::spawn(move || {
                for i in 0..100u32 {
                    let path = format!("C:\\apps\\app{}-{}.exe", t, i);
                    let window = resolver.window((t * 1000 + i) as isize + 1, &path, t * 1000 + i);
                    assert!(store.assign_zones(window, &device, LAYOUT, &[i as usize]));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..2u32 {
        for i in 0..100u32 {
            let window = (t * 1000 + i) as isize + 1;
            assert_eq!(store.last_zones(window, &device, LAYOUT), vec![i as usize]);
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn persisted_store_loads_back() {
    let (dir, paths) = scratch_paths();
    let resolver = Arc::new(FakeResolver::default());
    let window = resolver.window(0x10, EDITOR, 7);
    let device = device_on(1);

    let store = ZoneStore::with_paths(resolver.clone(), paths.clone(), false);
    store.add_device(&device);
    store.activate_zone_set(&device, ZoneSetData::new(LAYOUT, LayoutType::PriorityGrid));
    store.set_custom_zone_set(CustomZoneSet::new(
        OTHER_LAYOUT,
        "Canvas",
        CustomLayout::Canvas(CanvasLayout {
            ref_width: 1920,
            ref_height: 1080,
            zones: vec![CanvasZone { x: 0, y: 0, width: 960, height: 1080 }],
        }),
    ));
    store.assign_zones(window, &device, LAYOUT, &[0, 1]);
    store.persist().unwrap();

    let reloaded = ZoneStore::with_paths(resolver.clone(), paths, false);
    reloaded.load().unwrap();

    assert_eq!(reloaded.find_device(&device), store.find_device(&device));
    assert_eq!(
        reloaded.find_custom_zone_set(OTHER_LAYOUT),
        store.find_custom_zone_set(OTHER_LAYOUT)
    );
    assert_eq!(reloaded.last_zones(window, &device, LAYOUT), vec![0, 1]);
    // Window maps are runtime only
    assert!(reloaded.app_zone_history(EDITOR)[0]
        .process_id_to_handle
        .is_empty());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn autosave_writes_history_on_assignment() {
    let (dir, paths) = scratch_paths();
    let resolver = Arc::new(FakeResolver::default());
    let window = resolver.window(0x10, TERMINAL, 3);
    let store = ZoneStore::with_paths(resolver, paths.clone(), true);

    store.assign_zones(window, &device_on(1), LAYOUT, &[4]);

    let doc = persist::read_document(&paths.history).unwrap().unwrap();
    assert_eq!(doc["app-zone-history"][0]["app-path"], TERMINAL);
    assert_eq!(doc["app-zone-history"][0]["history"][0]["zone-index-set"][0], 4);
    assert!(!paths.settings.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn malformed_documents_load_as_empty() {
    let (dir, paths) = scratch_paths();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(&paths.settings, "{\"devices\": [ {\"device-id\": 12 ").unwrap();
    std::fs::write(&paths.history, "{\"app-zone-history\": {\"oops\": true}}").unwrap();

    let resolver = Arc::new(FakeResolver::default());
    let store = ZoneStore::with_paths(resolver, paths, false);
    store.load().unwrap();

    assert!(store.device_ids().is_empty());
    assert!(store.history_json()["app-zone-history"]
        .as_array()
        .unwrap()
        .is_empty());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn configured_store_reads_the_global_data_dir() {
    let (dir, paths) = scratch_paths();
    let resolver = Arc::new(FakeResolver::default());
    let device = device_on(9);

    let writer = ZoneStore::with_paths(resolver.clone(), paths, false);
    writer.add_device(&device);
    writer.persist().unwrap();

    {
        let mut config = crate::config::STORE_CONFIG.write();
        config.data_dir = dir.clone();
        config.autosave = false;
    }
    let store = ZoneStore::open_configured(resolver);
    *crate::config::STORE_CONFIG.write() = crate::config::StoreConfig::default();

    assert_eq!(store.device_ids(), vec![device]);
    assert_eq!(store.paths().map(|p| p.settings.parent()), Some(Some(dir.as_path())));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn editor_parameters_are_written_without_autosave() {
    let (dir, paths) = scratch_paths();
    let store = ZoneStore::with_paths(Arc::new(FakeResolver::default()), paths.clone(), false);
    let monitor = device_on(2);

    store
        .save_editor_parameters(&EditorParameters {
            process_id: 77,
            span_zones_across_monitors: false,
            virtual_desktop_id: desktop(2),
            target_monitor: monitor.clone(),
        })
        .unwrap();

    let doc = persist::read_document(&paths.editor_parameters).unwrap().unwrap();
    assert_eq!(doc["process-id"], 77);
    assert_eq!(doc["target-monitor"], monitor.to_string());
    assert!(!paths.settings.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn load_without_files_starts_empty() {
    let (_dir, paths) = scratch_paths();
    let store = ZoneStore::with_paths(Arc::new(FakeResolver::default()), paths, true);

    store.load().unwrap();

    assert!(store.device_ids().is_empty());
}

#[test]
fn concurrent_persists_leave_a_complete_document() {
    let (dir, paths) = scratch_paths();
    let resolver = Arc::new(FakeResolver::default());
    let store = Arc::new(ZoneStore::with_paths(resolver, paths.clone(), false));

    let handles: Vec<_> = (1..=4u128)
        .map(|n| {
            let store = store.clone();
            std::thread::spawn(move || {
                store.add_device(&device_on(n));
                store.persist().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    store.persist().unwrap();

    let doc = persist::read_document(&paths.settings).unwrap().unwrap();
    assert_eq!(doc["devices"].as_array().unwrap().len(), 4);

    let _ = std::fs::remove_dir_all(dir);
}

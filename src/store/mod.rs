//! Zone assignment store.
//!
//! Keeps which layout is active on each device, the geometry of custom
//! layouts, and where each application's windows were last zoned, and
//! persists them to two JSON documents. A third document hands launch
//! parameters to the layout editor.
//!
//! ## Locking
//!
//! All records live behind one `parking_lot::Mutex`. Every public operation is
//! a single critical section and never takes the lock twice. Window identity
//! (process path and id) is looked up through the `WindowResolver` before the
//! lock is taken. Persisting takes a separate I/O lock first, snapshots under
//! the data lock, then writes with only the I/O lock held, so concurrent saves
//! reach the disk in the order their snapshots were taken.

pub mod custom_layout;
pub mod json;
pub mod persist;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::store::{get_autosave, get_store_paths};
use crate::config::StoreConfig;
use crate::error::OverlayResult;

pub use custom_layout::{CanvasLayout, CanvasZone, CustomLayout, CustomZoneSet, GridLayout};
pub use json::HistoryMap;
pub use persist::StorePaths;
pub use resolver::WindowResolver;
#[cfg(windows)]
pub use resolver::Win32Resolver;
pub use types::{
    AppZoneHistory, DeviceId, DeviceInfo, EditorParameters, LayoutType, WindowHandle, ZoneSetData,
};

#[derive(Debug, Default)]
struct StoreData {
    devices: HashMap<DeviceId, DeviceInfo>,
    custom_zone_sets: HashMap<String, CustomZoneSet>,
    app_zone_history: HistoryMap,
}

/// A window resolved to its owning process.
#[derive(Debug, Clone)]
struct WindowIdentity {
    handle: WindowHandle,
    process_id: u32,
    app_path: String,
}

/// Which document a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Document {
    Settings,
    History,
}

/// Authoritative map of devices, custom layouts and application zone history.
pub struct ZoneStore {
    data: Mutex<StoreData>,
    io: Mutex<()>,
    resolver: Arc<dyn WindowResolver>,
    paths: Option<StorePaths>,
    autosave: bool,
}

impl ZoneStore {
    /// In-memory store; `persist` and `load` are no-ops.
    pub fn new(resolver: Arc<dyn WindowResolver>) -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            io: Mutex::new(()),
            resolver,
            paths: None,
            autosave: false,
        }
    }

    /// Store backed by the documents at `paths`. Nothing is read until `load`.
    pub fn with_paths(resolver: Arc<dyn WindowResolver>, paths: StorePaths, autosave: bool) -> Self {
        Self {
            paths: Some(paths),
            autosave,
            ..Self::new(resolver)
        }
    }

    /// Store configured from `config`, with its documents loaded.
    pub fn open(resolver: Arc<dyn WindowResolver>, config: &StoreConfig) -> Self {
        Self::with_paths(resolver, config.paths(), config.autosave).loaded()
    }

    /// Store configured from the global `STORE_CONFIG`, with its documents
    /// loaded.
    pub fn open_configured(resolver: Arc<dyn WindowResolver>) -> Self {
        Self::with_paths(resolver, get_store_paths(), get_autosave()).loaded()
    }

    /// Store for the current process using the global configuration.
    #[cfg(windows)]
    pub fn open_default() -> Self {
        Self::open_configured(Arc::new(Win32Resolver))
    }

    fn loaded(self) -> Self {
        if let Err(e) = self.load() {
            log::warn!("[STORE] Starting with empty zone data: {}", e);
        }
        self
    }

    pub fn paths(&self) -> Option<&StorePaths> {
        self.paths.as_ref()
    }

    // ========================================================================
    // Devices and layouts
    // ========================================================================

    pub fn find_device(&self, device: &DeviceId) -> Option<DeviceInfo> {
        self.data.lock().devices.get(device).cloned()
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.data.lock().devices.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn find_custom_zone_set(&self, uuid: &str) -> Option<CustomZoneSet> {
        self.data.lock().custom_zone_sets.get(uuid).cloned()
    }

    /// Add or replace a custom layout.
    pub fn set_custom_zone_set(&self, set: CustomZoneSet) {
        log::debug!("[STORE] Custom layout {} ({:?}) saved", set.uuid, set.name);
        self.data
            .lock()
            .custom_zone_sets
            .insert(set.uuid.clone(), set);
        self.autosave(Document::Settings);
    }

    /// Record a device on first sighting. Returns false if it was known.
    pub fn add_device(&self, device: &DeviceId) -> bool {
        let added = {
            let mut data = self.data.lock();
            if data.devices.contains_key(device) {
                false
            } else {
                data.devices.insert(device.clone(), DeviceInfo::default());
                true
            }
        };

        if added {
            log::info!("[STORE] New device {}", device);
            self.autosave(Document::Settings);
        }
        added
    }

    /// Make `zone_set` the active layout of an existing device.
    ///
    /// Returns false, changing nothing, when the device is unknown.
    pub fn activate_zone_set(&self, device: &DeviceId, zone_set: ZoneSetData) -> bool {
        let changed = {
            let mut data = self.data.lock();
            match data.devices.get_mut(device) {
                None => None,
                Some(info) if info.active_zone_set == zone_set => Some(false),
                Some(info) => {
                    info.active_zone_set = zone_set;
                    Some(true)
                }
            }
        };

        match changed {
            None => {
                log::debug!("[STORE] Cannot activate layout on unknown device {}", device);
                false
            }
            Some(changed) => {
                if changed {
                    self.autosave(Document::Settings);
                }
                true
            }
        }
    }

    /// Give `destination` a copy of `source`'s record.
    pub fn clone_device_info(&self, source: &DeviceId, destination: &DeviceId) {
        if source == destination {
            return;
        }

        let cloned = {
            let mut data = self.data.lock();
            match data.devices.get(source).cloned() {
                Some(info) => {
                    data.devices.insert(destination.clone(), info);
                    true
                }
                None => false,
            }
        };

        if cloned {
            self.autosave(Document::Settings);
        }
    }

    /// Move records made before desktop ids were known onto `desktop`.
    pub fn update_primary_desktop_data(&self, desktop: Uuid) {
        let (devices_moved, history_moved) = {
            let mut data = self.data.lock();

            let legacy: Vec<DeviceId> = data
                .devices
                .keys()
                .filter(|id| id.has_nil_desktop())
                .cloned()
                .collect();
            for id in &legacy {
                if let Some(info) = data.devices.remove(id) {
                    data.devices.insert(id.on_desktop(desktop), info);
                }
            }

            let mut history_moved = 0;
            for entry in data.app_zone_history.values_mut().flatten() {
                if entry.device_id.has_nil_desktop() {
                    entry.device_id = entry.device_id.on_desktop(desktop);
                    history_moved += 1;
                }
            }

            (legacy.len(), history_moved)
        };

        if devices_moved > 0 || history_moved > 0 {
            log::info!(
                "[STORE] Moved {} device(s) and {} history record(s) to desktop {}",
                devices_moved,
                history_moved,
                types::format_guid(&desktop)
            );
        }
        if devices_moved > 0 {
            self.autosave(Document::Settings);
        }
        if history_moved > 0 {
            self.autosave(Document::History);
        }
    }

    /// Forget devices, and their history, on desktops not in `active`.
    pub fn prune_desktops(&self, active: &[Uuid]) {
        let (devices_removed, history_removed) = {
            let mut data = self.data.lock();
            let stale = |id: &DeviceId| !active.contains(&id.virtual_desktop_id);

            let before = data.devices.len();
            data.devices.retain(|id, _| !stale(id));
            let devices_removed = before - data.devices.len();

            let mut history_removed = 0;
            data.app_zone_history.retain(|_, entries| {
                let before = entries.len();
                entries.retain(|e| !stale(&e.device_id));
                history_removed += before - entries.len();
                !entries.is_empty()
            });

            (devices_removed, history_removed)
        };

        if devices_removed > 0 {
            log::info!("[STORE] Pruned {} device(s) on closed desktops", devices_removed);
            self.autosave(Document::Settings);
        }
        if history_removed > 0 {
            self.autosave(Document::History);
        }
    }

    // ========================================================================
    // Application zone history
    // ========================================================================

    /// Recorded history of the application at `app_path`.
    pub fn app_zone_history(&self, app_path: &str) -> Vec<AppZoneHistory> {
        self.data
            .lock()
            .app_zone_history
            .get(app_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Another live window of `window`'s process is zoned on `device`.
    pub fn is_another_window_of_app_zoned(&self, window: WindowHandle, device: &DeviceId) -> bool {
        let Some(identity) = self.resolve(window) else {
            return false;
        };
        let data = self.data.lock();
        self.other_window_zoned(&data, &identity, device)
    }

    /// Record `window` as its process's window on `device`.
    pub fn update_process_id_to_handle_map(&self, window: WindowHandle, device: &DeviceId) {
        let Some(identity) = self.resolve(window) else {
            return;
        };
        let mut data = self.data.lock();
        if let Some(entries) = data.app_zone_history.get_mut(&identity.app_path) {
            for entry in entries.iter_mut().filter(|e| e.is_on(device)) {
                entry
                    .process_id_to_handle
                    .insert(identity.process_id, identity.handle);
            }
        }
    }

    /// Zones `window`'s application last occupied on `device` in `zone_set_uuid`.
    pub fn last_zones(
        &self,
        window: WindowHandle,
        device: &DeviceId,
        zone_set_uuid: &str,
    ) -> Vec<usize> {
        let Some(app_path) = self.resolver.process_path(window) else {
            return Vec::new();
        };
        let data = self.data.lock();
        data.app_zone_history
            .get(&app_path)
            .and_then(|entries| entries.iter().find(|e| e.matches(device, zone_set_uuid)))
            .map(|e| e.zone_index_set.clone())
            .unwrap_or_default()
    }

    /// Record that `window` now occupies `indices` of `zone_set_uuid` on `device`.
    ///
    /// Returns false when the window's application cannot be identified or
    /// another live window of the same process is already zoned there.
    pub fn assign_zones(
        &self,
        window: WindowHandle,
        device: &DeviceId,
        zone_set_uuid: &str,
        indices: &[usize],
    ) -> bool {
        let Some(identity) = self.resolve(window) else {
            log::debug!("[STORE] No application for window {:#x}", window);
            return false;
        };

        {
            let mut data = self.data.lock();
            if self.other_window_zoned(&data, &identity, device) {
                return false;
            }

            let entries = data
                .app_zone_history
                .entry(identity.app_path.clone())
                .or_default();

            match entries.iter_mut().find(|e| e.is_on(device)) {
                Some(entry) => {
                    entry
                        .process_id_to_handle
                        .insert(identity.process_id, identity.handle);
                    entry.zone_set_uuid = zone_set_uuid.to_string();
                    entry.zone_index_set = indices.to_vec();
                }
                None => entries.push(AppZoneHistory {
                    device_id: device.clone(),
                    zone_set_uuid: zone_set_uuid.to_string(),
                    zone_index_set: indices.to_vec(),
                    process_id_to_handle: HashMap::from([(identity.process_id, identity.handle)]),
                }),
            }
        }

        self.autosave(Document::History);
        true
    }

    /// Drop `window`'s placement in `zone_set_uuid` on `device`.
    ///
    /// The process's window mapping is kept while another of its live windows
    /// is zoned; the record goes once no window maps to it. Returns false
    /// when no record matched.
    pub fn remove_zones(&self, window: WindowHandle, device: &DeviceId, zone_set_uuid: &str) -> bool {
        let Some(identity) = self.resolve(window) else {
            return false;
        };

        {
            let mut data = self.data.lock();
            let other_zoned = self.other_window_zoned(&data, &identity, device);

            let Some(entries) = data.app_zone_history.get_mut(&identity.app_path) else {
                return false;
            };
            let Some(pos) = entries.iter().position(|e| e.matches(device, zone_set_uuid)) else {
                return false;
            };

            if !other_zoned {
                entries[pos].process_id_to_handle.remove(&identity.process_id);
            }
            if entries[pos].process_id_to_handle.is_empty() {
                entries.remove(pos);
            }
            if entries.is_empty() {
                data.app_zone_history.remove(&identity.app_path);
            }
        }

        self.autosave(Document::History);
        true
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Replace the in-memory records with the documents on disk.
    ///
    /// Missing files read as empty. An unparsable file is logged and treated
    /// as empty; bad sections and entries are skipped individually.
    pub fn load(&self) -> OverlayResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };

        let _io = self.io.lock();
        let settings = read_or_empty(&paths.settings);
        let history = read_or_empty(&paths.history);

        let settings = json::parse_settings(&settings);
        let history = json::parse_history(&history);

        log::info!(
            "[STORE] Loaded {} device(s), {} custom layout(s), history for {} app(s)",
            settings.devices.len(),
            settings.custom_zone_sets.len(),
            history.len()
        );

        let mut data = self.data.lock();
        data.devices = settings.devices;
        data.custom_zone_sets = settings.custom_zone_sets;
        data.app_zone_history = history;
        Ok(())
    }

    /// Write both documents.
    pub fn persist(&self) -> OverlayResult<()> {
        self.write(&[Document::Settings, Document::History])
    }

    /// Write the layout editor's launch parameters. Written on every call,
    /// regardless of autosave.
    pub fn save_editor_parameters(&self, params: &EditorParameters) -> OverlayResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };

        let _io = self.io.lock();
        persist::write_document(
            &paths.editor_parameters,
            &json::editor_parameters_to_json(params),
        )?;
        log::debug!(
            "[STORE] Editor parameters saved for {}",
            params.target_monitor
        );
        Ok(())
    }

    /// Current contents of `zones-settings.json`.
    pub fn settings_json(&self) -> Value {
        let data = self.data.lock();
        json::settings_to_json(&data.devices, &data.custom_zone_sets)
    }

    /// Current contents of `app-zone-history.json`.
    pub fn history_json(&self) -> Value {
        json::history_to_json(&self.data.lock().app_zone_history)
    }

    fn write(&self, documents: &[Document]) -> OverlayResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };

        let _io = self.io.lock();
        let snapshot: Vec<(&std::path::Path, Value)> = {
            let data = self.data.lock();
            documents
                .iter()
                .map(|doc| match doc {
                    Document::Settings => (
                        paths.settings.as_path(),
                        json::settings_to_json(&data.devices, &data.custom_zone_sets),
                    ),
                    Document::History => (
                        paths.history.as_path(),
                        json::history_to_json(&data.app_zone_history),
                    ),
                })
                .collect()
        };

        for (path, doc) in snapshot {
            persist::write_document(path, &doc)?;
        }
        Ok(())
    }

    fn autosave(&self, document: Document) {
        if !self.autosave {
            return;
        }
        if let Err(e) = self.write(&[document]) {
            log::error!("[STORE] Failed to save {:?} document: {}", document, e);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn resolve(&self, window: WindowHandle) -> Option<WindowIdentity> {
        let app_path = self.resolver.process_path(window)?;
        if app_path.is_empty() {
            return None;
        }
        let process_id = self.resolver.process_id(window)?;
        Some(WindowIdentity {
            handle: window,
            process_id,
            app_path,
        })
    }

    /// Caller holds the data lock.
    fn other_window_zoned(&self, data: &StoreData, identity: &WindowIdentity, device: &DeviceId) -> bool {
        let Some(entries) = data.app_zone_history.get(&identity.app_path) else {
            return false;
        };
        entries
            .iter()
            .filter(|e| e.is_on(device))
            .filter_map(|e| e.process_id_to_handle.get(&identity.process_id))
            .any(|&other| other != identity.handle && self.resolver.is_window(other))
    }
}

fn read_or_empty(path: &std::path::Path) -> Value {
    match persist::read_document(path) {
        Ok(Some(doc)) => doc,
        Ok(None) => Value::Null,
        Err(e) => {
            log::warn!("[STORE] Ignoring unreadable {}: {}", path.display(), e);
            Value::Null
        }
    }
}

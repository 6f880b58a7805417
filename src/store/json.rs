//! JSON documents: `zones-settings.json`, `app-zone-history.json` and the
//! write-only `editor-parameters.json`.
//!
//! Parsing is lenient. A section that is missing or not an array reads as
//! empty, and an entry that does not parse is skipped with a warning, so one
//! bad record never costs the user the rest of their layouts.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::custom_layout::{CanvasLayout, CustomLayout, CustomZoneSet, GridLayout};
use super::types::{
    format_guid, AppZoneHistory, DeviceId, DeviceInfo, EditorParameters, ZoneSetData, DEFAULT_SENSITIVITY_RADIUS,
    DEFAULT_SHOW_SPACING, DEFAULT_SPACING, DEFAULT_ZONE_COUNT,
};

const DEVICES: &str = "devices";
const CUSTOM_ZONE_SETS: &str = "custom-zone-sets";
const APP_ZONE_HISTORY: &str = "app-zone-history";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeviceEntry {
    device_id: DeviceId,
    #[serde(rename = "active-zoneset")]
    active_zone_set: ZoneSetData,
    #[serde(default = "default_show_spacing")]
    editor_show_spacing: bool,
    #[serde(default = "default_spacing")]
    editor_spacing: i32,
    #[serde(default = "default_zone_count")]
    editor_zone_count: i32,
    #[serde(default = "default_sensitivity_radius")]
    editor_sensitivity_radius: i32,
    #[serde(default)]
    span_zones_across_monitors: bool,
}

fn default_show_spacing() -> bool {
    DEFAULT_SHOW_SPACING
}
fn default_spacing() -> i32 {
    DEFAULT_SPACING
}
fn default_zone_count() -> i32 {
    DEFAULT_ZONE_COUNT
}
fn default_sensitivity_radius() -> i32 {
    DEFAULT_SENSITIVITY_RADIUS
}

impl DeviceEntry {
    fn into_record(self) -> (DeviceId, DeviceInfo) {
        (
            self.device_id,
            DeviceInfo {
                active_zone_set: self.active_zone_set,
                show_spacing: self.editor_show_spacing,
                spacing: self.editor_spacing,
                zone_count: self.editor_zone_count,
                sensitivity_radius: self.editor_sensitivity_radius,
                span_zones_across_monitors: self.span_zones_across_monitors,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CustomZoneSetEntry {
    uuid: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    info: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AppHistoryEntry {
    app_path: String,
    history: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HistoryItem {
    zone_index_set: Vec<usize>,
    device_id: DeviceId,
    #[serde(rename = "zoneset-uuid")]
    zone_set_uuid: String,
}

/// Contents of the settings document.
#[derive(Debug, Default)]
pub struct SettingsDocument {
    pub devices: HashMap<DeviceId, DeviceInfo>,
    pub custom_zone_sets: HashMap<String, CustomZoneSet>,
}

pub type HistoryMap = HashMap<String, Vec<AppZoneHistory>>;

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_settings(doc: &Value) -> SettingsDocument {
    let devices = entries::<DeviceEntry>(doc, DEVICES)
        .map(DeviceEntry::into_record)
        .collect();

    let custom_zone_sets = entries::<CustomZoneSetEntry>(doc, CUSTOM_ZONE_SETS)
        .filter_map(custom_zone_set_from_entry)
        .map(|set| (set.uuid.clone(), set))
        .collect();

    SettingsDocument {
        devices,
        custom_zone_sets,
    }
}

pub fn parse_history(doc: &Value) -> HistoryMap {
    let mut map = HistoryMap::new();
    for app in entries::<AppHistoryEntry>(doc, APP_ZONE_HISTORY) {
        let history: Vec<AppZoneHistory> = app
            .history
            .into_iter()
            .filter_map(|item| parse_entry::<HistoryItem>(item, APP_ZONE_HISTORY))
            .map(|item| AppZoneHistory {
                device_id: item.device_id,
                zone_set_uuid: item.zone_set_uuid,
                zone_index_set: item.zone_index_set,
                process_id_to_handle: HashMap::new(),
            })
            .collect();

        if !history.is_empty() {
            map.entry(app.app_path).or_default().extend(history);
        }
    }
    map
}

/// Entries of `doc[section]` that parse as `T`.
fn entries<T: DeserializeOwned>(doc: &Value, section: &'static str) -> impl Iterator<Item = T> {
    let items = match doc.get(section) {
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            log::warn!("[STORE] Section {:?} is not an array, ignoring it", section);
            Vec::new()
        }
        None => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(move |item| parse_entry(item, section))
}

fn parse_entry<T: DeserializeOwned>(item: Value, section: &str) -> Option<T> {
    match serde_json::from_value(item) {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::warn!("[STORE] Skipping malformed {} entry: {}", section, e);
            None
        }
    }
}

fn custom_zone_set_from_entry(entry: CustomZoneSetEntry) -> Option<CustomZoneSet> {
    let layout = match entry.kind.as_str() {
        "canvas" => CustomLayout::Canvas(parse_entry::<CanvasLayout>(entry.info, CUSTOM_ZONE_SETS)?),
        "grid" => CustomLayout::Grid(parse_entry::<GridLayout>(entry.info, CUSTOM_ZONE_SETS)?),
        other => {
            log::warn!("[STORE] Unknown custom layout type {:?} for {}", other, entry.uuid);
            return None;
        }
    };

    let set = CustomZoneSet::new(entry.uuid, entry.name, layout);
    if !set.is_valid() {
        log::warn!("[STORE] Custom layout {} has inconsistent geometry", set.uuid);
        return None;
    }
    Some(set)
}

// ============================================================================
// Serialization
// ============================================================================

/// Devices and custom layouts are written in key order so the file is stable.
pub fn settings_to_json(
    devices: &HashMap<DeviceId, DeviceInfo>,
    custom_zone_sets: &HashMap<String, CustomZoneSet>,
) -> Value {
    let mut device_ids: Vec<&DeviceId> = devices.keys().collect();
    device_ids.sort();
    let device_entries: Vec<Value> = device_ids
        .into_iter()
        .map(|id| {
            let info = &devices[id];
            json!({
                "device-id": id,
                "active-zoneset": info.active_zone_set,
                "editor-show-spacing": info.show_spacing,
                "editor-spacing": info.spacing,
                "editor-zone-count": info.zone_count,
                "editor-sensitivity-radius": info.sensitivity_radius,
                "span-zones-across-monitors": info.span_zones_across_monitors,
            })
        })
        .collect();

    let mut uuids: Vec<&String> = custom_zone_sets.keys().collect();
    uuids.sort();
    let custom: Vec<Value> = uuids
        .into_iter()
        .map(|uuid| {
            let set = &custom_zone_sets[uuid];
            let (kind, info) = match &set.layout {
                CustomLayout::Canvas(canvas) => ("canvas", json!(canvas)),
                CustomLayout::Grid(grid) => ("grid", json!(grid)),
            };
            json!({ "uuid": set.uuid, "name": set.name, "type": kind, "info": info })
        })
        .collect();

    json!({ "devices": device_entries, "custom-zone-sets": custom })
}

/// Window maps are runtime state and are not written.
pub fn history_to_json(history: &HistoryMap) -> Value {
    let mut paths: Vec<&String> = history.keys().collect();
    paths.sort();
    let apps: Vec<Value> = paths
        .into_iter()
        .map(|path| {
            let items: Vec<Value> = history[path]
                .iter()
                .map(|h| {
                    json!({
                        "zone-index-set": h.zone_index_set,
                        "device-id": h.device_id,
                        "zoneset-uuid": h.zone_set_uuid,
                    })
                })
                .collect();
            json!({ "app-path": path, "history": items })
        })
        .collect();

    json!({ "app-zone-history": apps })
}

/// Parameters handed to the layout editor. Never read back.
pub fn editor_parameters_to_json(params: &EditorParameters) -> Value {
    json!({
        "process-id": params.process_id,
        "span-zones-across-monitors": params.span_zones_across_monitors,
        "virtual-desktop-id": format_guid(&params.virtual_desktop_id),
        "target-monitor": params.target_monitor.to_string(),
    })
}

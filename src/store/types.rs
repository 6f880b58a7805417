//! Records kept by the zone store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::OverlayError;

/// Native window handle as an integer.
pub type WindowHandle = isize;

/// Monitor plus virtual desktop.
///
/// String form: `<name>_<width>_<height>_{<GUID>}`. The name may contain `_`,
/// so the id is parsed from the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    pub device_name: String,
    pub width: u32,
    pub height: u32,
    pub virtual_desktop_id: Uuid,
}

impl DeviceId {
    pub fn new(device_name: impl Into<String>, width: u32, height: u32, desktop: Uuid) -> Self {
        Self {
            device_name: device_name.into(),
            width,
            height,
            virtual_desktop_id: desktop,
        }
    }

    /// Recorded before virtual desktop ids were known.
    pub fn has_nil_desktop(&self) -> bool {
        self.virtual_desktop_id.is_nil()
    }

    /// Same monitor on another desktop.
    pub fn on_desktop(&self, desktop: Uuid) -> Self {
        Self {
            virtual_desktop_id: desktop,
            ..self.clone()
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.device_name,
            self.width,
            self.height,
            format_guid(&self.virtual_desktop_id)
        )
    }
}

impl FromStr for DeviceId {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OverlayError::InvalidDeviceId(s.to_string());

        let mut parts = s.rsplitn(4, '_');
        let guid = parts.next().ok_or_else(invalid)?;
        let height = parts.next().ok_or_else(invalid)?;
        let width = parts.next().ok_or_else(invalid)?;
        let name = parts.next().ok_or_else(invalid)?;

        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            device_name: name.to_string(),
            width: width.parse().map_err(|_| invalid())?,
            height: height.parse().map_err(|_| invalid())?,
            virtual_desktop_id: parse_guid(guid).ok_or_else(invalid)?,
        })
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`
pub fn format_guid(guid: &Uuid) -> String {
    format!("{{{:X}}}", guid)
}

/// Accepts a GUID with or without braces.
pub fn parse_guid(s: &str) -> Option<Uuid> {
    let inner = match (s.strip_prefix('{'), s.ends_with('}')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (None, false) => s,
        _ => return None,
    };
    Uuid::parse_str(inner).ok()
}

/// Kind of zone layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutType {
    #[default]
    Blank,
    Focus,
    Columns,
    Rows,
    Grid,
    PriorityGrid,
    Custom,
}

/// Reference to a zone layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSetData {
    pub uuid: String,
    #[serde(rename = "type")]
    pub layout_type: LayoutType,
}

impl ZoneSetData {
    pub fn new(uuid: impl Into<String>, layout_type: LayoutType) -> Self {
        Self {
            uuid: uuid.into(),
            layout_type,
        }
    }

    /// The layout of a device that has never had one applied.
    pub fn blank() -> Self {
        Self::new(format_guid(&Uuid::nil()), LayoutType::Blank)
    }
}

impl Default for ZoneSetData {
    fn default() -> Self {
        Self::blank()
    }
}

pub const DEFAULT_SHOW_SPACING: bool = true;
pub const DEFAULT_SPACING: i32 = 16;
pub const DEFAULT_ZONE_COUNT: i32 = 3;
pub const DEFAULT_SENSITIVITY_RADIUS: i32 = 20;

/// Per-device settings: the active layout and the editor's last parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub active_zone_set: ZoneSetData,
    pub show_spacing: bool,
    pub spacing: i32,
    pub zone_count: i32,
    pub sensitivity_radius: i32,
    pub span_zones_across_monitors: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            active_zone_set: ZoneSetData::blank(),
            show_spacing: DEFAULT_SHOW_SPACING,
            spacing: DEFAULT_SPACING,
            zone_count: DEFAULT_ZONE_COUNT,
            sensitivity_radius: DEFAULT_SENSITIVITY_RADIUS,
            span_zones_across_monitors: false,
        }
    }
}

/// Where one application's windows were last placed on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppZoneHistory {
    pub device_id: DeviceId,
    pub zone_set_uuid: String,
    pub zone_index_set: Vec<usize>,
    /// Live windows per process instance. Runtime only.
    pub process_id_to_handle: HashMap<u32, WindowHandle>,
}

impl AppZoneHistory {
    pub fn is_on(&self, device: &DeviceId) -> bool {
        &self.device_id == device
    }

    pub fn matches(&self, device: &DeviceId, zone_set_uuid: &str) -> bool {
        self.is_on(device) && self.zone_set_uuid == zone_set_uuid
    }
}

/// What the layout editor needs when it is launched for one monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorParameters {
    /// Process the editor reports back to.
    pub process_id: u32,
    pub span_zones_across_monitors: bool,
    pub virtual_desktop_id: Uuid,
    /// Monitor the editor opens on.
    pub target_monitor: DeviceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP: &str = "{39B25DD2-130D-4B5D-8851-4791D66B1539}";

    #[test]
    fn device_id_round_trips_through_string() {
        let s = format!("DELA026#5&10a58c63&0&UID16777488_1920_1080_{}", DESKTOP);
        let id: DeviceId = s.parse().unwrap();
        assert_eq!(id.device_name, "DELA026#5&10a58c63&0&UID16777488");
        assert_eq!(id.width, 1920);
        assert_eq!(id.height, 1080);
        assert_eq!(id.to_string(), s);
    }

    #[test]
    fn device_name_may_contain_underscores() {
        let id: DeviceId = format!("GENERIC_PNP_MONITOR_2560_1440_{}", DESKTOP)
            .parse()
            .unwrap();
        assert_eq!(id.device_name, "GENERIC_PNP_MONITOR");
        assert_eq!(id.width, 2560);
    }

    #[test]
    fn malformed_device_ids_are_rejected() {
        for bad in [
            "",
            "monitor",
            "monitor_1920_1080",
            "monitor_wide_1080_{39B25DD2-130D-4B5D-8851-4791D66B1539}",
            "monitor_1920_1080_not-a-guid",
            "monitor_1920_1080_{39B25DD2-130D-4B5D-8851-4791D66B1539",
            "_1920_1080_{39B25DD2-130D-4B5D-8851-4791D66B1539}",
        ] {
            assert!(
                matches!(bad.parse::<DeviceId>(), Err(OverlayError::InvalidDeviceId(_))),
                "{:?} parsed",
                bad
            );
        }
    }

    #[test]
    fn nil_desktop_marks_legacy_records() {
        let id = DeviceId::new("m", 800, 600, Uuid::nil());
        assert!(id.has_nil_desktop());
        assert!(id.to_string().ends_with("_{00000000-0000-0000-0000-000000000000}"));
        assert!(!id.on_desktop(Uuid::new_v4()).has_nil_desktop());
    }

    #[test]
    fn layout_types_use_kebab_case() {
        let json = serde_json::to_string(&LayoutType::PriorityGrid).unwrap();
        assert_eq!(json, "\"priority-grid\"");
        let data: ZoneSetData =
            serde_json::from_str(r#"{"uuid":"{X}","type":"columns"}"#).unwrap();
        assert_eq!(data.layout_type, LayoutType::Columns);
    }

    #[test]
    fn device_defaults() {
        let info = DeviceInfo::default();
        assert!(info.show_spacing);
        assert_eq!(info.spacing, 16);
        assert_eq!(info.zone_count, 3);
        assert_eq!(info.sensitivity_radius, 20);
        assert!(!info.span_zones_across_monitors);
        assert_eq!(info.active_zone_set.layout_type, LayoutType::Blank);
    }
}

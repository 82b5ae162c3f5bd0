// Wire types for the data center.
//
// Telemetry rows from the parsed/status/page-list endpoints are
// model-specific, so they stay as `serde_json::Value` and are keyed by
// their `time` field. The raw Beidou and Iridium feeds have fixed shapes.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ── Devices & models ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub device_model_id: String,
    pub serial_number: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub device_model: Option<Box<DeviceModel>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Device {
    /// Model number from the embedded model, when the server included it.
    pub fn model_number(&self) -> Option<&str> {
        self.device_model.as_deref().map(|m| m.model_number.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub device_model_id: String,
    pub serial_number: String,
    pub device_name: String,
    pub description: String,
}

/// Storage bucket a model's telemetry is written to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketMap {
    pub device_model_id: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceModel {
    pub id: String,
    pub model_number: String,
    pub model_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub bucket_maps: Option<BucketMap>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceModelForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub model_number: String,
    pub model_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
}

// ── Firmware ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Firmware {
    pub id: String,
    pub device_model_id: String,
    pub firmware_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub supported_hardware_versions: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A firmware image to upload. The file is streamed from disk as the
/// multipart `file` part.
#[derive(Debug, Clone)]
pub struct FirmwareUpload {
    pub file: PathBuf,
    pub device_model_id: String,
    pub firmware_version: String,
    pub description: Option<String>,
    pub supported_hardware_versions: Vec<String>,
}

// ── Telemetry ────────────────────────────────────────────────────────

/// Raw Beidou short message.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BeidouRecord {
    pub from_card: String,
    #[serde(default)]
    pub to_card: Option<String>,
    pub content: String,
    pub time: String,
}

/// Raw Iridium SBD message.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IridiumRecord {
    pub time: String,
    pub imei: String,
    pub content: String,
}

/// Cursor parameters shared by every anchor-paged feed.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Exclusive boundary; `None` means "from the most recent record" and
    /// is sent as the current time.
    #[serde(serialize_with = "anchor_or_now")]
    pub anchor_time: Option<String>,
    pub reverse: bool,
    pub limit: u32,
}

/// The current instant in the `2024-05-01T08:00:00.000Z` form the feeds
/// expect.
pub fn now_anchor() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[allow(clippy::ref_option)]
fn anchor_or_now<S: Serializer>(
    anchor: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match anchor {
        Some(time) => serializer.serialize_str(time),
        None => serializer.serialize_str(&now_anchor()),
    }
}

/// `data/parsed` selector.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDataQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_channel: Option<String>,
    #[serde(flatten)]
    pub anchor: Anchor,
}

/// `data/parsed/query` options against one storage bucket.
///
/// With `start`/`end` set the service returns every record in the range;
/// otherwise it behaves like an anchor page. Unset fields are left to the
/// service defaults.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryOptions {
    pub bucket: String,
    /// Platform serial number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_ascending: Option<bool>,
}

/// `query/device-status` selector.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub model_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(flatten)]
    pub anchor: Anchor,
}

/// `data/beidou/raw` selector.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BeidouQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_card: Option<String>,
    #[serde(flatten)]
    pub anchor: Anchor,
}

/// `data/iridium/raw` selector.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IridiumQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(flatten)]
    pub anchor: Anchor,
}

/// `query/device-data` offset page request. Field names are the
/// endpoint's short forms.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PageListQuery {
    pub model: String,
    pub sn: String,
    pub ch: u8,
    pub page: u32,
    pub size: u32,
}

/// A model-specific telemetry row.
pub type TelemetryRecord = Value;

// ── Access, commands, properties ─────────────────────────────────────

/// Devices granted to a user within one model.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeviceAccess {
    pub device_model_id: String,
    pub device_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub id: String,
    #[serde(default)]
    pub device_model_id: Option<String>,
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub is_sent_to_device: bool,
    #[serde(default)]
    pub sent_time: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandForm {
    pub device_id: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProperty {
    pub device_id: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePropertyForm {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub unit: String,
    pub description: String,
    pub is_read_only: bool,
    pub order: i32,
}

// ── Device model catalog ──
//
// Device models with their devices, fetched once and reused until a device
// or model mutation forces a reload.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tidewatch_api::data_center::models::{Device, DeviceModel};
use tracing::debug;

use super::collection::{EntityCollection, Keyed};
use crate::pagination::DeviceTarget;

impl Keyed for DeviceModel {
    fn id(&self) -> &str {
        &self.id
    }
    fn code(&self) -> &str {
        &self.model_number
    }
}

impl Keyed for Device {
    fn id(&self) -> &str {
        &self.id
    }
    fn code(&self) -> &str {
        &self.serial_number
    }
}

/// A device picker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialOption {
    pub id: String,
    pub label: String,
}

/// `SN | name (description)`, dropping whichever parts are empty.
pub fn serial_label(device: &Device) -> String {
    let name = Some(device.device_name.as_str()).filter(|s| !s.is_empty());
    let description = device.description.as_deref().filter(|s| !s.is_empty());
    match (name, description) {
        (Some(name), Some(desc)) => format!("{} | {name} ({desc})", device.serial_number),
        (Some(name), None) => format!("{} | {name}", device.serial_number),
        (None, Some(desc)) => format!("{} | {desc}", device.serial_number),
        (None, None) => device.serial_number.clone(),
    }
}

/// Cached device models and the devices they own.
pub struct DeviceCatalog {
    models: EntityCollection<DeviceModel>,
    devices: EntityCollection<Device>,
    loaded: AtomicBool,
}

impl std::fmt::Debug for DeviceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCatalog")
            .field("models", &self.models.len())
            .field("devices", &self.devices.len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Default for DeviceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self {
            models: EntityCollection::new(),
            devices: EntityCollection::new(),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Replace the cache with a freshly fetched model list.
    pub fn apply(&self, models: Vec<DeviceModel>) {
        let devices: Vec<Device> = models
            .iter()
            .flat_map(|m| {
                m.devices.iter().cloned().map(|mut d| {
                    if d.device_model_id.is_empty() {
                        d.device_model_id.clone_from(&m.id);
                    }
                    d
                })
            })
            .collect();
        debug!(models = models.len(), devices = devices.len(), "device catalog updated");

        self.models.replace_all(models);
        self.devices.replace_all(devices);
        self.loaded.store(true, Ordering::Release);
    }

    /// Mark the cache stale so the next load refetches.
    pub fn invalidate(&self) {
        self.loaded.store(false, Ordering::Release);
    }

    pub fn clear(&self) {
        self.models.clear();
        self.devices.clear();
        self.invalidate();
    }

    pub fn models(&self) -> Arc<Vec<Arc<DeviceModel>>> {
        self.models.snapshot()
    }

    pub fn model(&self, id: &str) -> Option<Arc<DeviceModel>> {
        self.models.get(id)
    }

    pub fn model_by_number(&self, model_number: &str) -> Option<Arc<DeviceModel>> {
        self.models.get_by_code(model_number)
    }

    /// Look up a model by id or model number.
    pub fn find_model(&self, key: &str) -> Option<Arc<DeviceModel>> {
        self.model(key).or_else(|| self.model_by_number(key))
    }

    pub fn devices(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn device(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    pub fn device_by_serial(&self, serial_number: &str) -> Option<Arc<Device>> {
        self.devices.get_by_code(serial_number)
    }

    /// Picker entries for the devices of one model.
    pub fn serial_number_options(&self, model_id: &str) -> Vec<SerialOption> {
        self.model(model_id)
            .map(|model| {
                model
                    .devices
                    .iter()
                    .map(|d| SerialOption {
                        id: d.id.clone(),
                        label: serial_label(d),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a serial number (or device id) into a telemetry target.
    pub fn target(&self, device: &str, upload_channel: Option<String>) -> Option<DeviceTarget> {
        let device = self
            .device_by_serial(device)
            .or_else(|| self.device(device))?;
        let model = self.model(&device.device_model_id)?;
        Some(DeviceTarget {
            device_model_id: model.id.clone(),
            model_number: model.model_number.clone(),
            serial_number: device.serial_number.clone(),
            upload_channel,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn models() -> Vec<DeviceModel> {
        serde_json::from_value(json!([
            {
                "id": "m1", "modelNumber": "WB-100", "modelName": "Wave buoy",
                "devices": [
                    { "id": "d1", "deviceModelId": "m1", "serialNumber": "SN001", "deviceName": "North", "description": "harbor" },
                    { "id": "d2", "deviceModelId": "", "serialNumber": "SN002", "deviceName": "South" },
                    { "id": "d3", "deviceModelId": "m1", "serialNumber": "SN003", "deviceName": "", "description": "spare" },
                    { "id": "d4", "deviceModelId": "m1", "serialNumber": "SN004", "deviceName": "" }
                ]
            },
            { "id": "m2", "modelNumber": "MB-7", "modelName": "Met buoy", "devices": [] }
        ]))
        .unwrap()
    }

    #[test]
    fn apply_marks_loaded_and_indexes_devices() {
        let catalog = DeviceCatalog::new();
        assert!(!catalog.is_loaded());

        catalog.apply(models());
        assert!(catalog.is_loaded());
        assert_eq!(catalog.models().len(), 2);
        assert_eq!(catalog.find_model("MB-7").unwrap().id, "m2");
        assert_eq!(catalog.device_by_serial("SN002").unwrap().device_model_id, "m1");
    }

    #[test]
    fn serial_labels_cover_every_shape() {
        let catalog = DeviceCatalog::new();
        catalog.apply(models());

        let labels: Vec<_> = catalog
            .serial_number_options("m1")
            .into_iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(
            labels,
            vec!["SN001 | North (harbor)", "SN002 | South", "SN003 | spare", "SN004"]
        );
        assert!(catalog.serial_number_options("missing").is_empty());
    }

    #[test]
    fn target_resolves_model_fields() {
        let catalog = DeviceCatalog::new();
        catalog.apply(models());

        let target = catalog.target("SN001", Some("2".into())).unwrap();
        assert_eq!(
            target,
            DeviceTarget {
                device_model_id: "m1".into(),
                model_number: "WB-100".into(),
                serial_number: "SN001".into(),
                upload_channel: Some("2".into()),
            }
        );
        assert!(catalog.target("SN999", None).is_none());
    }

    #[test]
    fn invalidate_keeps_data_but_clears_flag() {
        let catalog = DeviceCatalog::new();
        catalog.apply(models());
        catalog.invalidate();

        assert!(!catalog.is_loaded());
        assert_eq!(catalog.models().len(), 2);
    }
}

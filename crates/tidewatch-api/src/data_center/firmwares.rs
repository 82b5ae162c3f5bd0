use reqwest::multipart::{Form, Part};
use serde::de::IgnoredAny;
use tracing::debug;

use super::DataCenterClient;
use super::models::{Firmware, FirmwareUpload};
use crate::envelope::QueryResult;
use crate::error::Error;

impl DataCenterClient {
    pub async fn firmwares_by_model(&self, model_id: &str) -> Result<QueryResult<Firmware>, Error> {
        self.inner
            .get_with_query("firmwares/by-model", &[("deviceModelId", model_id)])
            .await
    }

    pub async fn firmwares_by_device(
        &self,
        device_id: &str,
    ) -> Result<QueryResult<Firmware>, Error> {
        self.inner
            .get_with_query("firmwares/by-device", &[("deviceId", device_id)])
            .await
    }

    /// Upload a firmware image as `multipart/form-data`.
    pub async fn upload_firmware(&self, upload: &FirmwareUpload) -> Result<Firmware, Error> {
        let bytes = tokio::fs::read(&upload.file).await?;
        let file_name = upload
            .file
            .file_name()
            .map_or_else(|| "firmware.bin".to_owned(), |n| n.to_string_lossy().into_owned());
        debug!(file = %file_name, size = bytes.len(), "uploading firmware");

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("deviceModelId", upload.device_model_id.clone())
            .text("firmwareVersion", upload.firmware_version.clone());
        if let Some(description) = &upload.description {
            form = form.text("description", description.clone());
        }
        for version in &upload.supported_hardware_versions {
            form = form.text("supportedHardwareVersions", version.clone());
        }

        self.inner.post_multipart("firmwares/upload", form).await
    }

    pub async fn delete_firmware(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("firmwares/{id}")).await?;
        Ok(())
    }
}

use serde::de::IgnoredAny;

use super::DataCenterClient;
use super::models::{DeviceCommand, DeviceCommandForm};
use crate::client::Auth;
use crate::error::Error;

impl DataCenterClient {
    /// Commands queued for a device, sent or pending.
    pub async fn device_commands(&self, device_id: &str) -> Result<Vec<DeviceCommand>, Error> {
        self.inner
            .get_with_query("device-commands", &[("deviceId", device_id)])
            .await
    }

    /// Queue a command; returns the command id.
    pub async fn create_device_command(&self, form: &DeviceCommandForm) -> Result<String, Error> {
        self.inner.post("device-commands", form, Auth::Bearer).await
    }

    pub async fn delete_device_command(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("device-commands/{id}")).await?;
        Ok(())
    }
}

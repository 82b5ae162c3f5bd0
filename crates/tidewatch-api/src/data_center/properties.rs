use serde::de::IgnoredAny;

use super::DataCenterClient;
use super::models::{DeviceProperty, DevicePropertyForm};
use crate::client::Auth;
use crate::error::Error;

impl DataCenterClient {
    pub async fn device_properties(&self, device_id: &str) -> Result<Vec<DeviceProperty>, Error> {
        self.inner
            .get(&format!("device-properties/{device_id}"))
            .await
    }

    pub async fn create_device_property(
        &self,
        device_id: &str,
        key: &str,
        form: &DevicePropertyForm,
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post(&format!("device-properties/{device_id}/{key}"), form, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn update_device_property(
        &self,
        device_id: &str,
        key: &str,
        form: &DevicePropertyForm,
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .put(&format!("device-properties/{device_id}/{key}"), form)
            .await?;
        Ok(())
    }

    pub async fn delete_device_property(&self, device_id: &str, key: &str) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .delete(&format!("device-properties/{device_id}/{key}"))
            .await?;
        Ok(())
    }
}

use serde::de::IgnoredAny;

use super::DataCenterClient;
use super::models::{Device, DeviceForm};
use crate::client::Auth;
use crate::error::Error;

impl DataCenterClient {
    /// List devices, optionally restricted to one device model.
    pub async fn list_devices(&self, model_id: Option<&str>) -> Result<Vec<Device>, Error> {
        match model_id {
            Some(id) => {
                self.inner
                    .get_with_query("devices", &[("modelNumberId", id)])
                    .await
            }
            None => self.inner.get("devices").await,
        }
    }

    pub async fn get_device(&self, id: &str) -> Result<Device, Error> {
        self.inner.get(&format!("devices/{id}")).await
    }

    /// Create a device; returns the new device id.
    pub async fn create_device(&self, form: &DeviceForm) -> Result<String, Error> {
        self.inner.post("devices", form, Auth::Bearer).await
    }

    pub async fn update_device(&self, id: &str, form: &DeviceForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("devices/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_device(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("devices/{id}")).await?;
        Ok(())
    }
}

use serde::de::IgnoredAny;

use super::DataCenterClient;
use super::models::{DeviceModel, DeviceModelForm};
use crate::client::Auth;
use crate::error::Error;

impl DataCenterClient {
    pub async fn list_device_models(&self) -> Result<Vec<DeviceModel>, Error> {
        self.inner.get("device-models").await
    }

    pub async fn create_device_model(&self, form: &DeviceModelForm) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post("device-models", form, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn update_device_model(&self, id: &str, form: &DeviceModelForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("device-models/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_device_model(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("device-models/{id}")).await?;
        Ok(())
    }
}

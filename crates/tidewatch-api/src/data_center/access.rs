use serde::de::IgnoredAny;

use super::DataCenterClient;
use super::models::{AssignDeviceAccess, Device};
use crate::client::Auth;
use crate::error::Error;

impl DataCenterClient {
    /// Replace the devices a user may see within one model.
    pub async fn assign_devices(&self, user_id: &str, access: &AssignDeviceAccess) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post(&format!("device-access/assign/{user_id}"), access, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn assigned_devices(&self, user_id: &str, model_id: &str) -> Result<Vec<Device>, Error> {
        self.inner
            .get_with_query(
                &format!("device-access/assign/{user_id}"),
                &[("deviceModelId", model_id)],
            )
            .await
    }

    /// Devices of one model the signed-in user has been granted.
    pub async fn my_devices(&self, model_id: &str) -> Result<Vec<Device>, Error> {
        self.inner
            .get(&format!("device-access/my-devices/{model_id}"))
            .await
    }
}

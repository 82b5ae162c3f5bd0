use serde::de::IgnoredAny;

use super::AuthCenterClient;
use super::models::{PermissionForm, PermissionNode};
use crate::client::Auth;
use crate::envelope::QueryResult;
use crate::error::Error;

impl AuthCenterClient {
    pub async fn permission_tree(&self) -> Result<QueryResult<PermissionNode>, Error> {
        self.inner.get("permissions/tree").await
    }

    pub async fn create_permission(&self, form: &PermissionForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.post("permissions", form, Auth::Bearer).await?;
        Ok(())
    }

    pub async fn update_permission(&self, id: &str, form: &PermissionForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("permissions/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_permission(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("permissions/{id}")).await?;
        Ok(())
    }
}

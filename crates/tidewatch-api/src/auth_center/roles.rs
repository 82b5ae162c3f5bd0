use serde::de::IgnoredAny;

use super::AuthCenterClient;
use super::models::{Role, RoleForm};
use crate::client::Auth;
use crate::envelope::QueryResult;
use crate::error::Error;

impl AuthCenterClient {
    pub async fn list_roles(&self) -> Result<QueryResult<Role>, Error> {
        self.inner.get("roles").await
    }

    pub async fn create_role(&self, form: &RoleForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.post("roles", form, Auth::Bearer).await?;
        Ok(())
    }

    pub async fn update_role(&self, id: &str, form: &RoleForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("roles/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_role(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("roles/{id}")).await?;
        Ok(())
    }

    /// Replace the set of menus visible to a role.
    pub async fn assign_role_menus(&self, id: &str, menu_ids: &[String]) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post(&format!("roles/{id}/menus"), menu_ids, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn role_menu_ids(&self, id: &str) -> Result<Vec<String>, Error> {
        self.inner.get(&format!("roles/{id}/menu-ids")).await
    }

    /// Replace the set of permissions granted to a role.
    pub async fn assign_role_permissions(
        &self,
        id: &str,
        permission_ids: &[String],
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post(&format!("roles/{id}/permissions"), permission_ids, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn role_permission_ids(&self, id: &str) -> Result<Vec<String>, Error> {
        self.inner.get(&format!("roles/{id}/permission-ids")).await
    }
}

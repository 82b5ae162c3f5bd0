use serde::de::IgnoredAny;

use super::AuthCenterClient;
use super::models::{MenuForm, MenuNode};
use crate::client::Auth;
use crate::envelope::QueryResult;
use crate::error::Error;

impl AuthCenterClient {
    /// The full menu tree (administration view).
    pub async fn menu_tree(&self) -> Result<QueryResult<MenuNode>, Error> {
        self.inner.get("menus/tree").await
    }

    /// Menus visible to the signed-in user.
    pub async fn my_menus(&self) -> Result<QueryResult<MenuNode>, Error> {
        self.inner.get("menus/me").await
    }

    pub async fn create_menu(&self, form: &MenuForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.post("menus", form, Auth::Bearer).await?;
        Ok(())
    }

    pub async fn update_menu(&self, id: &str, form: &MenuForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("menus/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_menu(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("menus/{id}")).await?;
        Ok(())
    }
}

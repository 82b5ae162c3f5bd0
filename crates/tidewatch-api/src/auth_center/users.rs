use serde::de::IgnoredAny;
use serde_json::json;

use super::AuthCenterClient;
use super::models::{CurrentUser, User, UserForm};
use crate::client::Auth;
use crate::envelope::QueryResult;
use crate::error::Error;

impl AuthCenterClient {
    /// The signed-in user and their role codes.
    pub async fn current_user(&self) -> Result<CurrentUser, Error> {
        self.inner.get("users/me").await
    }

    /// All users (admin only).
    pub async fn list_users(&self) -> Result<QueryResult<User>, Error> {
        self.inner.get("users").await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, Error> {
        self.inner.get(&format!("users/{id}")).await
    }

    pub async fn create_user(&self, form: &UserForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.post("users", form, Auth::Bearer).await?;
        Ok(())
    }

    pub async fn update_user(&self, id: &str, form: &UserForm) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.put(&format!("users/{id}"), form).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), Error> {
        let _: IgnoredAny = self.inner.delete(&format!("users/{id}")).await?;
        Ok(())
    }

    /// Replace the user's role assignments.
    pub async fn assign_roles(&self, id: &str, role_ids: &[String]) -> Result<(), Error> {
        let _: IgnoredAny = self
            .inner
            .post(&format!("users/{id}/roles"), role_ids, Auth::Bearer)
            .await?;
        Ok(())
    }

    pub async fn user_role_ids(&self, id: &str) -> Result<Vec<String>, Error> {
        self.inner.get(&format!("users/{id}/role-ids")).await
    }

    /// Change the signed-in user's own password.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), Error> {
        let body = json!({ "oldPassword": old_password, "newPassword": new_password });
        let _: IgnoredAny = self
            .inner
            .post("users/change-password", &body, Auth::Bearer)
            .await?;
        Ok(())
    }

    /// Reset another user's password (admin only).
    pub async fn reset_password(&self, user_id: &str, new_password: &str) -> Result<(), Error> {
        let body = json!({ "userId": user_id, "newPassword": new_password });
        let _: IgnoredAny = self
            .inner
            .post("users/reset-password", &body, Auth::Bearer)
            .await?;
        Ok(())
    }
}

// Auth center client: login, token refresh, users, roles, menus, permissions.

mod auth;
pub mod models;
mod menus;
mod permissions;
mod roles;
mod users;

use std::sync::Arc;

use url::Url;

use crate::auth::{Service, TokenProvider};
use crate::client::ServiceClient;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Async client for the auth center REST API.
#[derive(Debug, Clone)]
pub struct AuthCenterClient {
    inner: ServiceClient,
}

impl AuthCenterClient {
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, Error> {
        Ok(Self {
            inner: ServiceClient::new(Service::AuthCenter, base_url, transport, tokens)?,
        })
    }

    /// Wrap an existing `reqwest::Client` (tests, shared connection pools).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        Self {
            inner: ServiceClient::with_client(Service::AuthCenter, http, base_url, tokens),
        }
    }

    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }
}

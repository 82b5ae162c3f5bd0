// Data center client: devices, models, firmware, telemetry, access,
// commands, properties, and export links.

mod access;
mod commands;
mod device_models;
mod devices;
mod export;
mod firmwares;
pub mod models;
mod properties;
mod telemetry;

use std::sync::Arc;

use url::Url;

pub use export::ExportQuery;

use crate::auth::{Service, TokenProvider};
use crate::client::ServiceClient;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Async client for the data center REST API.
#[derive(Debug, Clone)]
pub struct DataCenterClient {
    inner: ServiceClient,
}

impl DataCenterClient {
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, Error> {
        Ok(Self {
            inner: ServiceClient::new(Service::DataCenter, base_url, transport, tokens)?,
        })
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        Self {
            inner: ServiceClient::with_client(Service::DataCenter, http, base_url, tokens),
        }
    }

    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// WebSocket URL of the device event hub (`ws(s)://…/device-events`).
    pub fn hub_url(&self) -> Result<Url, Error> {
        let path = Service::DataCenter.hub_path().unwrap_or("device-events");
        crate::hub::websocket_url(&self.inner.url(path)?)
    }
}

// tidewatch-api: Async Rust client for the tidewatch auth center, data
// center, and device event hub.

pub mod auth;
pub mod auth_center;
pub mod client;
pub mod data_center;
pub mod envelope;
pub mod error;
pub mod hub;
pub mod transport;

pub use auth::{Service, StaticToken, TokenProvider};
pub use auth_center::AuthCenterClient;
pub use client::ServiceClient;
pub use data_center::{DataCenterClient, ExportQuery};
pub use envelope::{ApiResponse, QueryResult, SUCCESS_CODE};
pub use error::Error;
pub use hub::{HubConnection, HubLifecycle, HubOptions, HubState, ReconnectConfig};
pub use transport::{TlsMode, TransportConfig};

// ── Runtime console configuration ──
//
// These types describe *how* to reach the two backend services. They carry
// credential data and connection tuning, but never touch disk. The CLI
// builds a `ConsoleConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use tidewatch_api::hub::HubOptions;
use url::Url;

/// Default rows per anchor page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default rows per offset page.
pub const DEFAULT_OFFSET_PAGE_SIZE: u32 = 20;

/// Username + password for the login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (lab deployments with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one console session against one deployment.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Auth center root, e.g. `https://ops.example.com/auth-center/`.
    pub auth_center_url: Url,
    /// Data center root, e.g. `https://ops.example.com/data-center/`.
    pub data_center_url: Url,
    pub credentials: Option<Credentials>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Rows requested per anchor page.
    pub page_size: u32,
    pub hub: HubOptions,
}

impl ConsoleConfig {
    pub fn new(auth_center_url: Url, data_center_url: Url) -> Self {
        Self {
            auth_center_url,
            data_center_url,
            credentials: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            hub: HubOptions::default(),
        }
    }
}

use secrecy::SecretString;

/// Supplies the bearer token attached to authenticated requests.
///
/// The clients never own session state: the session store (or a test
/// double) implements this and is handed in at construction time. Returning
/// `None` sends the request without an `Authorization` header.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<SecretString>;
}

/// A fixed token, for scripts and tests that already hold a valid token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub SecretString);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// Which backend a client talks to.
///
/// Both services share one envelope and auth scheme but live at separate
/// base URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Users, roles, menus, permissions, login and token refresh.
    AuthCenter,
    /// Devices, models, firmware, telemetry, and the device event hub.
    DataCenter,
}

impl Service {
    pub fn label(self) -> &'static str {
        match self {
            Self::AuthCenter => "auth center",
            Self::DataCenter => "data center",
        }
    }

    /// Path of the realtime hub, relative to the service base URL.
    ///
    /// Returns `None` for [`AuthCenter`](Self::AuthCenter), which has no
    /// push channel.
    pub fn hub_path(self) -> Option<&'static str> {
        match self {
            Self::AuthCenter => None,
            Self::DataCenter => Some("device-events"),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn static_token_always_yields() {
        let provider = StaticToken(SecretString::from("abc".to_string()));
        let token = provider.access_token();
        assert_eq!(token.as_ref().map(ExposeSecret::expose_secret), Some("abc"));
    }

    #[test]
    fn only_data_center_has_hub() {
        assert_eq!(Service::DataCenter.hub_path(), Some("device-events"));
        assert!(Service::AuthCenter.hub_path().is_none());
    }
}

use thiserror::Error;

/// Top-level error type for the `tidewatch-api` crate.
///
/// Covers every failure mode across both REST services and the device
/// event hub. `tidewatch-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the server rejected the bearer token (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request needed an access token but none was available.
    #[error("Not signed in -- log in first")]
    MissingToken,

    /// Access or refresh token has expired.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The signed-in user lacks the role or permission for this call (HTTP 403).
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Envelope ────────────────────────────────────────────────────
    /// The service answered with a non-zero envelope `code` or a
    /// non-success HTTP status.
    #[error("API error (code {code}): {message}")]
    Api {
        code: i32,
        message: String,
        status: u16,
    },

    // ── Event hub ───────────────────────────────────────────────────
    /// Hub WebSocket connection or handshake failed.
    #[error("Hub connection failed: {0}")]
    HubConnect(String),

    /// Hub connection closed by the server.
    #[error("Hub closed: {reason}")]
    HubClosed { reason: String },

    /// The hub rejected an invocation.
    #[error("Hub invocation '{target}' failed: {message}")]
    HubInvocation { target: String, message: String },

    /// The hub is not connected.
    #[error("Hub is not connected")]
    HubNotConnected,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Local file I/O (firmware uploads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionExpired | Self::MissingToken
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::HubConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the envelope error code, if available.
    pub fn api_error_code(&self) -> Option<i32> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_404_is_not_found() {
        let err = Error::Api {
            code: 404,
            message: "device missing".into(),
            status: 404,
        };
        assert!(err.is_not_found());
        assert_eq!(err.api_error_code(), Some(404));
        assert!(!err.is_transient());
    }

    #[test]
    fn auth_family_is_expired() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(Error::MissingToken.is_auth_expired());
        assert!(!Error::Forbidden { message: String::new() }.is_auth_expired());
    }
}

// ── Core error types ──
//
// User-facing errors from tidewatch-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<tidewatch_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not signed in -- run `tidewatch login` first")]
    NotAuthenticated,

    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Envelope `code` reported by the service.
        code: Option<i32>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tidewatch_api::Error> for CoreError {
    fn from(err: tidewatch_api::Error) -> Self {
        use tidewatch_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::MissingToken => CoreError::NotAuthenticated,
            ApiError::SessionExpired => CoreError::SessionExpired,
            ApiError::Forbidden { message } => CoreError::PermissionDenied { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "Resource".into(),
                identifier: message,
            },
            ApiError::Api {
                code,
                message,
                status,
            } => CoreError::Api {
                message,
                code: Some(code),
                status: Some(status),
            },
            ApiError::HubConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("event hub: {reason}"),
            },
            ApiError::HubClosed { reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("event hub closed: {reason}"),
            },
            ApiError::HubNotConnected => CoreError::ConnectionFailed {
                url: String::new(),
                reason: "event hub is not connected".into(),
            },
            ApiError::HubInvocation { target, message } => CoreError::Api {
                message: format!("{target}: {message}"),
                code: None,
                status: None,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::Io(e) => CoreError::ValidationFailed {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_404_becomes_not_found() {
        let err: CoreError = tidewatch_api::Error::Api {
            code: 404,
            message: "device d9".into(),
            status: 404,
        }
        .into();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn envelope_code_is_kept() {
        let err: CoreError = tidewatch_api::Error::Api {
            code: 50010,
            message: "role in use".into(),
            status: 200,
        }
        .into();
        match err {
            CoreError::Api { code, status, .. } => {
                assert_eq!(code, Some(50010));
                assert_eq!(status, Some(200));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_becomes_permission_denied() {
        let err: CoreError = tidewatch_api::Error::Forbidden {
            message: "admin only".into(),
        }
        .into();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));
    }
}

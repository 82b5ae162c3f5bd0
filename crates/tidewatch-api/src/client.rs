// Service HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection,
// and `{code, data, message}` envelope unwrapping. Endpoint groups for each
// service live in `auth_center/` and `data_center/` as inherent methods on
// the service-specific wrappers, keeping this module focused on transport
// mechanics.

use std::sync::Arc;

use reqwest::multipart::Form;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{Service, TokenProvider};
use crate::envelope::{ApiResponse, BareEnvelope, SUCCESS_CODE};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Bearer,
    /// Login, captcha, and token refresh must not send a (possibly stale)
    /// access token.
    Anonymous,
}

/// Raw HTTP client for one backend service.
///
/// All methods return the unwrapped `data` payload -- the envelope is
/// stripped and checked before the caller sees it.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
    service: Service,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("has_tokens", &self.tokens.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `https://host/auth-center/`);
    /// a trailing slash is added if missing so relative paths join under it.
    pub fn new(
        service: Service,
        base_url: Url,
        transport: &TransportConfig,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(service, http, base_url, tokens))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        service: Service,
        http: reqwest::Client,
        base_url: Url,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            service,
            tokens,
        }
    }

    /// The service root URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn service(&self) -> Service {
        self.service
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"devices/42"`) onto the base URL.
    ///
    /// Leading slashes are ignored so `"/menus"` and `"menus"` both land
    /// under the service root rather than the host root.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, builder: reqwest::RequestBuilder, auth: Auth) -> reqwest::RequestBuilder {
        if auth == Auth::Anonymous {
            return builder;
        }
        match self.tokens.as_ref().and_then(|t| t.access_token()) {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => {
                trace!(service = self.service.label(), "no access token available");
                builder
            }
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let builder = self.authorize(self.http.get(url), Auth::Bearer);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!("GET {url} (with query)");

        let builder = self.authorize(self.http.get(url).query(query), Auth::Bearer);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B, auth: Auth) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!("POST {url}");

        let builder = self.authorize(self.http.post(url).json(body), auth);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let builder = self.authorize(self.http.put(url).json(body), Auth::Bearer);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let builder = self.authorize(self.http.delete(url), Auth::Bearer);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} (multipart)");

        let builder = self.authorize(self.http.post(url).multipart(form), Auth::Bearer);
        let resp = builder.send().await?;
        parse_envelope(resp).await
    }
}

/// Ensure the base path ends in `/` so `Url::join` appends instead of
/// replacing the last segment.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Check HTTP status and the `{code, data, message}` envelope, returning
/// `data` on success.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: envelope_message(&body)
                .unwrap_or_else(|| "access token missing, expired, or invalid".into()),
        });
    }

    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Forbidden {
            message: envelope_message(&body).unwrap_or_else(|| "HTTP 403".into()),
        });
    }

    if !status.is_success() {
        let (code, message) = match serde_json::from_str::<BareEnvelope>(&body) {
            Ok(env) => (
                env.code,
                env.message.unwrap_or_else(|| format!("HTTP {status}")),
            ),
            Err(_) => (
                i32::from(status.as_u16()),
                format!("HTTP {status}: {}", preview(&body)),
            ),
        };
        return Err(Error::Api {
            code,
            message,
            status: status.as_u16(),
        });
    }

    let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
        // A non-zero code with a `data` shape we did not expect is still an
        // API error, not a decoding bug.
        if let Ok(bare) = serde_json::from_str::<BareEnvelope>(&body) {
            if bare.code != SUCCESS_CODE {
                return Error::Api {
                    code: bare.code,
                    message: bare.message.unwrap_or_default(),
                    status: status.as_u16(),
                };
            }
        }
        Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        }
    })?;

    if envelope.code != SUCCESS_CODE {
        return Err(Error::Api {
            code: envelope.code,
            message: envelope.message,
            status: status.as_u16(),
        });
    }

    Ok(envelope.data)
}

fn envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<BareEnvelope>(body)
        .ok()
        .and_then(|env| env.message)
        .filter(|m| !m.is_empty())
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ServiceClient {
        ServiceClient::with_client(
            Service::DataCenter,
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            None,
        )
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let c = client("https://example.test/data-center");
        assert_eq!(c.base_url().as_str(), "https://example.test/data-center/");
    }

    #[test]
    fn leading_slash_stays_under_service_root() {
        let c = client("https://example.test/auth-center/");
        assert_eq!(
            c.url("/menus/tree").unwrap().as_str(),
            "https://example.test/auth-center/menus/tree"
        );
        assert_eq!(
            c.url("users/me").unwrap().as_str(),
            "https://example.test/auth-center/users/me"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}

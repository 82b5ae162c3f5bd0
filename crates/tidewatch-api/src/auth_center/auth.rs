// Login, captcha, and token refresh.
//
// All three run without the bearer token: login and captcha happen before a
// session exists, and refresh carries the refresh token in the body so a
// stale access token never takes part in renewing itself.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use super::AuthCenterClient;
use super::models::{Captcha, CaptchaAnswer, RawTokenPair, TokenPair};
use crate::client::Auth;
use crate::error::Error;

impl AuthCenterClient {
    /// Fetch a login captcha.
    pub async fn captcha(&self) -> Result<Captcha, Error> {
        self.inner.get("captcha").await
    }

    /// Authenticate with username, password, and captcha answer.
    ///
    /// Envelope or HTTP failures on this endpoint are reported as
    /// [`Error::Authentication`] so callers can treat them uniformly.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        captcha: &CaptchaAnswer,
    ) -> Result<TokenPair, Error> {
        debug!(username, "logging in");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
            "code": captcha.code,
            "codeId": captcha.code_id,
        });

        let raw: RawTokenPair = self
            .inner
            .post("auth/login", &body, Auth::Anonymous)
            .await
            .map_err(|e| match e {
                Error::Api { message, .. } | Error::Authentication { message } => {
                    Error::Authentication { message }
                }
                other => other,
            })?;

        debug!("login successful");
        Ok(raw.into())
    }

    /// Exchange a refresh token for a fresh token pair.
    ///
    /// An auth or envelope failure here means the refresh token itself is no
    /// longer valid, surfaced as [`Error::SessionExpired`].
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair, Error> {
        debug!("refreshing access token");

        let body = json!({ "refreshToken": refresh_token.expose_secret() });
        let raw: RawTokenPair = self
            .inner
            .post("auth/refresh", &body, Auth::Anonymous)
            .await
            .map_err(|e| match e {
                Error::Api { .. } | Error::Authentication { .. } => Error::SessionExpired,
                other => other,
            })?;

        Ok(raw.into())
    }
}

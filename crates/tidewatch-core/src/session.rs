// ── Session state ──
//
// Token pair with expiry, the signed-in user's roles, and their menu tree.
// Shared process-wide behind `Arc<SessionStore>`; readers never block and
// the last write wins. The HTTP clients see it only through the
// `TokenProvider` trait.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tidewatch_api::TokenProvider;
use tidewatch_api::auth_center::models::{CurrentUser, MenuNode, TokenPair};
use tracing::debug;

/// Access tokens are kept for a quarter hour.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

pub const REFRESH_TOKEN_TTL_DAYS: i64 = 15;

/// Role assigned when the server reports none, so role filtering always
/// has something to match against.
pub const DEFAULT_ROLE: &str = "DEFAULT_ROLE";

struct Tokens {
    access: SecretString,
    access_expires_at: DateTime<Utc>,
    refresh: SecretString,
    refresh_expires_at: DateTime<Utc>,
    username: Option<String>,
}

/// What `load_profile` learned about the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub username: String,
    pub roles: Vec<String>,
    pub menus: Vec<MenuNode>,
}

/// On-disk form of a session, written next to the CLI config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub username: Option<String>,
}

pub struct SessionStore {
    tokens: ArcSwapOption<Tokens>,
    profile: ArcSwapOption<Profile>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.is_signed_in())
            .field("profile_loaded", &self.profile.load().is_some())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            tokens: ArcSwapOption::empty(),
            profile: ArcSwapOption::empty(),
        }
    }

    /// Store a freshly issued token pair, stamping expiries from `now`.
    pub fn set_tokens(&self, pair: TokenPair, username: Option<String>, now: DateTime<Utc>) {
        let username = username.or_else(|| {
            self.tokens
                .load()
                .as_ref()
                .and_then(|t| t.username.clone())
        });
        self.tokens.store(Some(Arc::new(Tokens {
            access: pair.access_token,
            access_expires_at: now + TimeDelta::minutes(ACCESS_TOKEN_TTL_MINUTES),
            refresh: pair.refresh_token,
            refresh_expires_at: now + TimeDelta::days(REFRESH_TOKEN_TTL_DAYS),
            username,
        })));
        debug!("session tokens updated");
    }

    /// Drop tokens and the cached profile.
    pub fn clear(&self) {
        self.tokens.store(None);
        self.profile.store(None);
    }

    pub fn is_signed_in(&self) -> bool {
        self.tokens.load().is_some()
    }

    /// `true` while the access token has not reached its expiry.
    pub fn access_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.tokens
            .load()
            .as_ref()
            .is_some_and(|t| now < t.access_expires_at)
    }

    /// The refresh token, unless missing or expired.
    pub fn refresh_token_at(&self, now: DateTime<Utc>) -> Option<SecretString> {
        self.tokens
            .load()
            .as_ref()
            .filter(|t| now < t.refresh_expires_at)
            .map(|t| t.refresh.clone())
    }

    /// Cache the current user and menu tree for the rest of the session.
    ///
    /// An empty role list is replaced by [`DEFAULT_ROLE`].
    pub fn set_profile(&self, user: CurrentUser, menus: Vec<MenuNode>) -> Arc<Profile> {
        let roles = if user.roles.is_empty() {
            vec![DEFAULT_ROLE.to_owned()]
        } else {
            user.roles
        };
        let profile = Arc::new(Profile {
            username: user.user_name,
            roles,
            menus,
        });
        self.profile.store(Some(Arc::clone(&profile)));
        profile
    }

    pub fn profile(&self) -> Option<Arc<Profile>> {
        self.profile.load_full()
    }

    pub fn username(&self) -> Option<String> {
        if let Some(profile) = self.profile.load().as_ref() {
            return Some(profile.username.clone());
        }
        self.tokens
            .load()
            .as_ref()
            .and_then(|t| t.username.clone())
    }

    pub fn to_file(&self) -> Option<SessionFile> {
        let tokens = self.tokens.load_full()?;
        Some(SessionFile {
            access_token: tokens.access.expose_secret().to_owned(),
            access_expires_at: tokens.access_expires_at,
            refresh_token: tokens.refresh.expose_secret().to_owned(),
            refresh_expires_at: tokens.refresh_expires_at,
            username: self.username(),
        })
    }

    pub fn restore(&self, file: SessionFile) {
        self.tokens.store(Some(Arc::new(Tokens {
            access: SecretString::from(file.access_token),
            access_expires_at: file.access_expires_at,
            refresh: SecretString::from(file.refresh_token),
            refresh_expires_at: file.refresh_expires_at,
            username: file.username,
        })));
    }
}

impl TokenProvider for SessionStore {
    fn access_token(&self) -> Option<SecretString> {
        self.tokens.load().as_ref().map(|t| t.access.clone())
    }
}

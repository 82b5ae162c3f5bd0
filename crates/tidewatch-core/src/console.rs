// ── Console facade ──
//
// One signed-in console session against one deployment: both service
// clients sharing a session store, the device catalog, and constructors
// for the pagers and live subscriptions that read from them.

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tidewatch_api::auth_center::models::{Captcha, CaptchaAnswer};
use tidewatch_api::data_center::models::{DeviceForm, DeviceModel, DeviceModelForm};
use tidewatch_api::{
    AuthCenterClient, DataCenterClient, ExportQuery, HubConnection, TlsMode, TokenProvider,
    TransportConfig,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ConsoleConfig, DEFAULT_OFFSET_PAGE_SIZE, TlsVerification};
use crate::error::CoreError;
use crate::live::{self, LiveSubscription};
use crate::pagination::{
    AnchorPager, BeidouFeed, DeviceDataSource, DeviceTarget, Feed, IridiumFeed, LogNotifier,
    Notifier, OffsetPager, ParsedFeed, StatusFeed,
};
use crate::routes::{ComponentRegistry, Route, full_routes};
use crate::session::{Profile, SessionStore};
use crate::store::DeviceCatalog;

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<ConsoleInner>`.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    session: Arc<SessionStore>,
    auth: AuthCenterClient,
    data: DataCenterClient,
    catalog: DeviceCatalog,
    notifier: Arc<dyn Notifier>,
    /// Serializes token refreshes so concurrent callers share one.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("auth_center", &self.inner.config.auth_center_url.as_str())
            .field("data_center", &self.inner.config.data_center_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

fn build_transport(config: &ConsoleConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}

impl Console {
    /// Build a console with a fresh session and log-only notices.
    pub fn new(config: ConsoleConfig) -> Result<Self, CoreError> {
        Self::with_parts(config, Arc::new(SessionStore::new()), Arc::new(LogNotifier))
    }

    /// Build a console over an existing (possibly restored) session.
    pub fn with_parts(
        config: ConsoleConfig,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let http = transport.build_client()?;
        let tokens: Arc<dyn TokenProvider> = session.clone();

        let auth = AuthCenterClient::with_client(
            http.clone(),
            config.auth_center_url.clone(),
            Some(Arc::clone(&tokens)),
        );
        let data =
            DataCenterClient::with_client(http, config.data_center_url.clone(), Some(tokens));

        Ok(Self {
            inner: Arc::new(ConsoleInner {
                config,
                session,
                auth,
                data,
                catalog: DeviceCatalog::new(),
                notifier,
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.inner.catalog
    }

    pub fn auth_center(&self) -> &AuthCenterClient {
        &self.inner.auth
    }

    pub fn data_center(&self) -> &DataCenterClient {
        &self.inner.data
    }

    // ── Session ──────────────────────────────────────────────────────

    pub async fn captcha(&self) -> Result<Captcha, CoreError> {
        Ok(self.inner.auth.captcha().await?)
    }

    /// Sign in with the configured credentials.
    pub async fn login(&self, answer: &CaptchaAnswer) -> Result<Arc<Profile>, CoreError> {
        let Some(credentials) = self.inner.config.credentials.as_ref() else {
            return Err(CoreError::Config {
                message: "no credentials configured".into(),
            });
        };
        self.login_with(&credentials.username, &credentials.password, answer)
            .await
    }

    /// Sign in, store the token pair, and load the user's profile.
    pub async fn login_with(
        &self,
        username: &str,
        password: &SecretString,
        answer: &CaptchaAnswer,
    ) -> Result<Arc<Profile>, CoreError> {
        let pair = self.inner.auth.login(username, password, answer).await?;
        self.inner
            .session
            .set_tokens(pair, Some(username.to_owned()), Utc::now());
        info!(username, "signed in");
        self.fetch_profile().await
    }

    /// Drop the session and every cache derived from it.
    pub fn logout(&self) {
        self.inner.session.clear();
        self.inner.catalog.clear();
        info!("signed out");
    }

    /// Make sure the access token is usable, refreshing it once if it
    /// has expired. A failed refresh ends the session.
    pub async fn ensure_fresh(&self) -> Result<(), CoreError> {
        let session = &self.inner.session;
        if !session.is_signed_in() {
            return Err(CoreError::NotAuthenticated);
        }
        if session.access_valid_at(Utc::now()) {
            return Ok(());
        }

        let _guard = self.inner.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if session.access_valid_at(Utc::now()) {
            return Ok(());
        }

        let Some(refresh_token) = session.refresh_token_at(Utc::now()) else {
            warn!("refresh token expired");
            self.logout();
            return Err(CoreError::SessionExpired);
        };

        debug!("access token expired, refreshing");
        match self.inner.auth.refresh(&refresh_token).await {
            Ok(pair) => {
                session.set_tokens(pair, None, Utc::now());
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                self.logout();
                Err(CoreError::SessionExpired)
            }
        }
    }

    /// The signed-in user's profile, fetched once per session.
    pub async fn load_profile(&self) -> Result<Arc<Profile>, CoreError> {
        if let Some(profile) = self.inner.session.profile() {
            return Ok(profile);
        }
        self.ensure_fresh().await?;
        self.fetch_profile().await
    }

    async fn fetch_profile(&self) -> Result<Arc<Profile>, CoreError> {
        let user = self.inner.auth.current_user().await?;
        let menus = self.inner.auth.my_menus().await?.items;
        let profile = self.inner.session.set_profile(user, menus);
        debug!(
            username = %profile.username,
            roles = ?profile.roles,
            menus = profile.menus.len(),
            "profile loaded"
        );
        Ok(profile)
    }

    /// Every route the signed-in user can reach.
    pub async fn routes(&self, registry: &dyn ComponentRegistry) -> Result<Vec<Route>, CoreError> {
        let profile = self.load_profile().await?;
        Ok(full_routes(&profile.menus, &profile.roles, registry))
    }

    // ── Device catalog ───────────────────────────────────────────────

    /// Device models with their devices, from cache unless `force`.
    pub async fn device_models(
        &self,
        force: bool,
    ) -> Result<Arc<Vec<Arc<DeviceModel>>>, CoreError> {
        let catalog = &self.inner.catalog;
        if catalog.is_loaded() && !force {
            debug!("device models already loaded");
            return Ok(catalog.models());
        }
        self.ensure_fresh().await?;
        let models = self.inner.data.list_device_models().await?;
        catalog.apply(models);
        Ok(catalog.models())
    }

    async fn reload_catalog(&self) -> Result<(), CoreError> {
        self.device_models(true).await.map(|_| ())
    }

    pub async fn create_device_model(&self, form: &DeviceModelForm) -> Result<(), CoreError> {
        self.ensure_fresh().await?;
        self.inner.data.create_device_model(form).await?;
        self.reload_catalog().await
    }

    pub async fn update_device_model(
        &self,
        id: &str,
        form: &DeviceModelForm,
    ) -> Result<(), CoreError> {
        self.ensure_fresh().await?;
        self.inner.data.update_device_model(id, form).await?;
        self.reload_catalog().await
    }

    pub async fn delete_device_model(&self, id: &str) -> Result<(), CoreError> {
        self.ensure_fresh().await?;
        self.inner.data.delete_device_model(id).await?;
        self.reload_catalog().await
    }

    /// Create a device; returns its id.
    pub async fn create_device(&self, form: &DeviceForm) -> Result<String, CoreError> {
        self.ensure_fresh().await?;
        let id = self.inner.data.create_device(form).await?;
        self.reload_catalog().await?;
        Ok(id)
    }

    pub async fn update_device(&self, id: &str, form: &DeviceForm) -> Result<(), CoreError> {
        self.ensure_fresh().await?;
        self.inner.data.update_device(id, form).await?;
        self.reload_catalog().await
    }

    pub async fn delete_device(&self, id: &str) -> Result<(), CoreError> {
        self.ensure_fresh().await?;
        self.inner.data.delete_device(id).await?;
        self.reload_catalog().await
    }

    /// Resolve a serial number or device id to a telemetry target.
    pub async fn resolve_target(
        &self,
        device: &str,
        upload_channel: Option<String>,
    ) -> Result<DeviceTarget, CoreError> {
        self.device_models(false).await?;
        self.inner
            .catalog
            .target(device, upload_channel)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "device".into(),
                identifier: device.to_owned(),
            })
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub fn parsed_pager(&self) -> AnchorPager<ParsedFeed> {
        AnchorPager::new(
            ParsedFeed(self.inner.data.clone()),
            self.inner.config.page_size,
            Arc::clone(&self.inner.notifier),
        )
    }

    pub fn status_pager(&self) -> AnchorPager<StatusFeed> {
        AnchorPager::new(
            StatusFeed(self.inner.data.clone()),
            self.inner.config.page_size,
            Arc::clone(&self.inner.notifier),
        )
    }

    pub fn beidou_pager(&self) -> AnchorPager<BeidouFeed> {
        AnchorPager::new(
            BeidouFeed(self.inner.data.clone()),
            self.inner.config.page_size,
            Arc::clone(&self.inner.notifier),
        )
    }

    pub fn iridium_pager(&self) -> AnchorPager<IridiumFeed> {
        AnchorPager::new(
            IridiumFeed(self.inner.data.clone()),
            self.inner.config.page_size,
            Arc::clone(&self.inner.notifier),
        )
    }

    pub fn device_data_pager(&self) -> OffsetPager<DeviceDataSource> {
        OffsetPager::new(
            DeviceDataSource(self.inner.data.clone()),
            DEFAULT_OFFSET_PAGE_SIZE,
            Arc::clone(&self.inner.notifier),
        )
    }

    async fn hub(&self) -> Result<HubConnection, CoreError> {
        self.ensure_fresh().await?;
        let url = self.inner.data.hub_url()?;
        let tokens: Arc<dyn TokenProvider> = self.inner.session.clone();
        Ok(HubConnection::new(url, Some(tokens), self.inner.config.hub.clone()))
    }

    /// Subscribe to live data for one device model.
    pub async fn watch_model<F>(
        &self,
        model_id: &str,
        on_data: F,
    ) -> Result<LiveSubscription, CoreError>
    where
        F: Fn(&str, serde_json::Value) + Send + Sync + 'static,
    {
        let hub = self.hub().await?;
        Ok(LiveSubscription::open(hub, model_id, on_data).await)
    }

    /// Keep the first page of `pager` current with live pushes from the
    /// device it is showing.
    pub async fn follow<F>(
        &self,
        pager: &Arc<AnchorPager<F>>,
    ) -> Result<LiveSubscription, CoreError>
    where
        F: Feed<Selector = DeviceTarget, Item = serde_json::Value> + 'static,
    {
        let target = pager.selector().ok_or_else(|| CoreError::ValidationFailed {
            message: "select a device before following live data".into(),
        })?;
        self.device_models(false).await?;
        let device = self
            .inner
            .catalog
            .device_by_serial(&target.serial_number)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "device".into(),
                identifier: target.serial_number.clone(),
            })?;
        let hub = self.hub().await?;
        debug!(serial = %target.serial_number, device_id = %device.id, "following live data");
        Ok(live::follow_pager(hub, &target, device.id.clone(), Arc::clone(pager)).await)
    }

    pub fn export_url(&self, query: &ExportQuery) -> Result<Url, CoreError> {
        Ok(self.inner.data.excel_quick_export_url(query)?)
    }
}

// Console flows against wiremock-backed auth and data centers.
#![allow(clippy::unwrap_used)]

use chrono::{TimeDelta, Utc};
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tidewatch_api::auth_center::models::CaptchaAnswer;
use tidewatch_api::data_center::models::DeviceForm;
use tidewatch_core::session::DEFAULT_ROLE;
use tidewatch_core::{Console, ConsoleConfig, CoreError, SessionFile};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Console) {
    let server = MockServer::start().await;
    let config = ConsoleConfig::new(
        Url::parse(&format!("{}/auth-center/", server.uri())).unwrap(),
        Url::parse(&format!("{}/data-center/", server.uri())).unwrap(),
    );
    let console = Console::new(config).unwrap();
    (server, console)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": data, "message": "ok" }))
}

fn session(access_expired: bool) -> SessionFile {
    let now = Utc::now();
    SessionFile {
        access_token: "stale-access".into(),
        access_expires_at: if access_expired {
            now - TimeDelta::minutes(1)
        } else {
            now + TimeDelta::minutes(10)
        },
        refresh_token: "refresh-1".into(),
        refresh_expires_at: now + TimeDelta::days(3),
        username: Some("alice".into()),
    }
}

async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth-center/users/me"))
        .respond_with(ok(json!({ "userName": "alice", "roles": [] })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth-center/menus/me"))
        .respond_with(ok(json!({
            "items": [ { "id": "1", "name": "Devices", "type": 0, "routePath": "/devices" } ],
            "total": 1
        })))
        .mount(server)
        .await;
}

async fn mount_models(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/data-center/device-models"))
        .respond_with(ok(json!([
            {
                "id": "m1", "modelNumber": "WB-100", "modelName": "Wave buoy",
                "devices": [ { "id": "d1", "deviceModelId": "m1", "serialNumber": "SN001", "deviceName": "North" } ]
            }
        ])))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_tokens_and_loads_profile() {
    let (server, console) = setup().await;
    Mock::given(method("POST"))
        .and(path("/auth-center/auth/login"))
        .respond_with(ok(json!({ "accessToken": "a-1", "refreshToken": "r-1" })))
        .mount(&server)
        .await;
    mount_profile(&server).await;

    let profile = console
        .login_with(
            "alice",
            &SecretString::from("pw".to_string()),
            &CaptchaAnswer::default(),
        )
        .await
        .unwrap();

    assert_eq!(profile.username, "alice");
    assert_eq!(profile.roles, vec![DEFAULT_ROLE.to_owned()]);
    assert_eq!(profile.menus.len(), 1);

    let file = console.session().to_file().unwrap();
    assert_eq!(file.access_token, "a-1");
    assert_eq!(file.refresh_token, "r-1");
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_once() {
    let (server, console) = setup().await;
    console.session().restore(session(true));

    Mock::given(method("POST"))
        .and(path("/auth-center/auth/refresh"))
        .respond_with(ok(json!({ "accessToken": "fresh", "refreshToken": "refresh-2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data-center/device-models"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(console.ensure_fresh(), console.ensure_fresh());
    a.unwrap();
    b.unwrap();
    console.device_models(false).await.unwrap();
}

#[tokio::test]
async fn test_failed_refresh_ends_session() {
    let (server, console) = setup().await;
    console.session().restore(session(true));

    Mock::given(method("POST"))
        .and(path("/auth-center/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = console.ensure_fresh().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired), "got {err:?}");
    assert!(!console.session().is_signed_in());
}

#[tokio::test]
async fn test_not_signed_in() {
    let (_server, console) = setup().await;
    let err = console.device_models(false).await.unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
}

#[tokio::test]
async fn test_profile_is_fetched_once_per_session() {
    let (server, console) = setup().await;
    console.session().restore(session(false));
    Mock::given(method("GET"))
        .and(path("/auth-center/users/me"))
        .respond_with(ok(json!({ "userName": "alice", "roles": ["admin"] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth-center/menus/me"))
        .respond_with(ok(json!({ "items": [], "total": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    console.load_profile().await.unwrap();
    let routes = console
        .routes(&tidewatch_core::routes::StaticRegistry::builtin())
        .await
        .unwrap();
    assert_eq!(routes.last().unwrap().name.as_deref(), Some("System"));
}

// ── Catalog tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_device_models_are_cached_until_mutation() {
    let (server, console) = setup().await;
    console.session().restore(session(false));
    mount_models(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/data-center/devices"))
        .respond_with(ok(json!("d2")))
        .expect(1)
        .mount(&server)
        .await;

    console.device_models(false).await.unwrap();
    console.device_models(false).await.unwrap();

    let id = console
        .create_device(&DeviceForm {
            device_model_id: "m1".into(),
            serial_number: "SN002".into(),
            ..DeviceForm::default()
        })
        .await
        .unwrap();
    assert_eq!(id, "d2");
}

#[tokio::test]
async fn test_resolve_target_unknown_device() {
    let (server, console) = setup().await;
    console.session().restore(session(false));
    mount_models(&server, 1).await;

    let target = console.resolve_target("SN001", None).await.unwrap();
    assert_eq!(target.model_number, "WB-100");

    let err = console.resolve_target("SN404", None).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

// ── Pager wiring ────────────────────────────────────────────────────

#[tokio::test]
async fn test_parsed_pager_queries_newest_first() {
    let (server, console) = setup().await;
    console.session().restore(session(false));
    mount_models(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/data-center/data/parsed"))
        .and(query_param("serialNumber", "SN001"))
        .and(query_param("modelNumber", "WB-100"))
        .and(query_param("reverse", "true"))
        .and(query_param("limit", "50"))
        .respond_with(ok(json!({
            "items": [ { "time": "2024-05-01T00:00:10Z" }, { "time": "2024-05-01T00:00:00Z" } ],
            "total": 2
        })))
        .mount(&server)
        .await;

    let target = console.resolve_target("SN001", None).await.unwrap();
    let pager = console.parsed_pager();
    pager.set_selector(Some(target)).await;

    let state = pager.snapshot();
    assert_eq!(state.items.len(), 2);
    assert!(state.is_last_page);
    assert_eq!(state.page_index, 1);
}

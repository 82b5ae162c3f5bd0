// Integration tests for `DataCenterClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tidewatch_api::data_center::models::{
    Anchor, BeidouQuery, DataQueryOptions, DeviceForm, FirmwareUpload, PageListQuery, ParsedDataQuery, now_anchor,
};
use tidewatch_api::{DataCenterClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DataCenterClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/data-center/", server.uri())).unwrap();
    let client = DataCenterClient::with_client(reqwest::Client::new(), base, None);
    (server, client)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": data, "message": "" }))
}

// ── Devices & models ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_filters_by_model() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/devices"))
        .and(query_param("modelNumberId", "m1"))
        .respond_with(ok(json!([
            { "id": "d1", "deviceModelId": "m1", "serialNumber": "SN-001", "deviceName": "North buoy", "isActive": true },
            { "id": "d2", "deviceModelId": "m1", "serialNumber": "SN-002", "deviceName": "South buoy", "isActive": false }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices(Some("m1")).await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].serial_number, "SN-002");
    assert!(!devices[1].is_active);
}

#[tokio::test]
async fn test_create_device_returns_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/data-center/devices"))
        .respond_with(ok(json!("d-new")))
        .mount(&server)
        .await;

    let id = client
        .create_device(&DeviceForm {
            device_model_id: "m1".into(),
            serial_number: "SN-100".into(),
            device_name: "Harbor".into(),
            ..DeviceForm::default()
        })
        .await
        .unwrap();
    assert_eq!(id, "d-new");
}

#[tokio::test]
async fn test_device_models_with_bucket_map() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/device-models"))
        .respond_with(ok(json!([{
            "id": "m1",
            "modelNumber": "WB-01",
            "modelName": "Weather buoy",
            "devices": [],
            "bucketMaps": { "deviceModelId": "m1", "bucketName": "wb01" }
        }])))
        .mount(&server)
        .await;

    let models = client.list_device_models().await.unwrap();
    assert_eq!(models[0].bucket_maps.as_ref().unwrap().bucket_name, "wb01");
}

#[tokio::test]
async fn test_missing_device_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/devices/nope"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "code": 404, "message": "device not found" })),
        )
        .mount(&server)
        .await;

    let err = client.get_device("nope").await.unwrap_err();
    assert!(err.is_not_found(), "expected not-found, got {err:?}");
}

// ── Telemetry ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_parsed_data_sends_anchor_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/data/parsed"))
        .and(query_param("serialNumber", "SN-001"))
        .and(query_param("anchorTime", "2024-05-01T00:00:00Z"))
        .and(query_param("reverse", "true"))
        .and(query_param("limit", "50"))
        .respond_with(ok(json!({
            "items": [{ "time": "2024-04-30T23:50:00Z", "ubatt": 12400 }],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .parsed_data(&ParsedDataQuery {
            device_model_id: Some("m1".into()),
            serial_number: Some("SN-001".into()),
            anchor: Anchor {
                anchor_time: Some("2024-05-01T00:00:00Z".into()),
                reverse: true,
                limit: 50,
            },
            ..ParsedDataQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0]["ubatt"], 12400);
}

#[tokio::test]
async fn test_beidou_raw_without_anchor_sends_current_time() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/data/beidou/raw"))
        .respond_with(ok(json!({
            "items": [{ "fromCard": "0412345", "content": "A1B2", "time": "2024-05-01T00:00:00Z" }],
            "total": 1
        })))
        .mount(&server)
        .await;

    let before = now_anchor();
    let page = client
        .beidou_raw(&BeidouQuery {
            from_card: Some("0412345".into()),
            anchor: Anchor {
                anchor_time: None,
                reverse: true,
                limit: 50,
            },
            ..BeidouQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items[0].from_card, "0412345");

    let after = now_anchor();

    let requests = server.received_requests().await.unwrap();
    let sent = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "anchorTime")
        .map(|(_, v)| v.into_owned())
        .expect("anchorTime is always sent");
    assert!(sent >= before && sent <= after, "sent {sent}");
}

#[tokio::test]
async fn test_query_data_sends_range_options() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/data/parsed/query"))
        .and(query_param("bucket", "buoy_wb01"))
        .and(query_param("psn", "SN-001"))
        .and(query_param("uploadChannel", "2"))
        .and(query_param("start", "2024-05-01T00:00:00Z"))
        .and(query_param("end", "2024-05-02T00:00:00Z"))
        .and(query_param("sortAscending", "true"))
        .respond_with(ok(json!([
            { "time": "2024-05-01T00:10:00Z", "ubatt": 12400 },
            { "time": "2024-05-01T00:20:00Z", "ubatt": 12390 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client
        .query_data(&DataQueryOptions {
            bucket: "buoy_wb01".into(),
            psn: Some("SN-001".into()),
            upload_channel: Some(2),
            start: Some("2024-05-01T00:00:00Z".into()),
            end: Some("2024-05-02T00:00:00Z".into()),
            sort_ascending: Some(true),
            ..DataQueryOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["ubatt"], 12390);

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_owned();
    assert!(!query.contains("anchorTime"), "query was {query}");
    assert!(!query.contains("limit"), "query was {query}");
}

#[tokio::test]
async fn test_device_data_page_uses_short_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/query/device-data"))
        .and(query_param("model", "WB-01"))
        .and(query_param("sn", "SN-001"))
        .and(query_param("ch", "2"))
        .and(query_param("page", "3"))
        .and(query_param("size", "20"))
        .respond_with(ok(json!({ "items": [], "total": 41 })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .device_data_page(&PageListQuery {
            model: "WB-01".into(),
            sn: "SN-001".into(),
            ch: 2,
            page: 3,
            size: 20,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 41);
}

#[tokio::test]
async fn test_envelope_failure_on_telemetry_is_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/data/iridium/raw"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 1, "data": null, "message": "bucket offline" })),
        )
        .mount(&server)
        .await;

    let err = client.iridium_raw(&Default::default()).await.unwrap_err();
    assert_eq!(err.api_error_code(), Some(1));
}

// ── Firmware ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_firmware_is_multipart() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/data-center/firmwares/upload"))
        .respond_with(ok(json!({
            "id": "fw1",
            "deviceModelId": "m1",
            "firmwareVersion": "1.4.2",
            "md5": "d41d8cd98f00b204e9800998ecf8427e"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\x7fELF firmware").unwrap();

    let firmware = client
        .upload_firmware(&FirmwareUpload {
            file: file.path().to_path_buf(),
            device_model_id: "m1".into(),
            firmware_version: "1.4.2".into(),
            description: Some("fixes GPS drift".into()),
            supported_hardware_versions: vec!["r2".into(), "r3".into()],
        })
        .await
        .unwrap();
    assert_eq!(firmware.firmware_version, "1.4.2");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"firmwareVersion\""));
    assert!(body.contains("ELF firmware"));
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let (_server, client) = setup().await;

    let err = client
        .upload_firmware(&FirmwareUpload {
            file: "/nonexistent/fw.bin".into(),
            device_model_id: "m1".into(),
            firmware_version: "0.0.1".into(),
            description: None,
            supported_hardware_versions: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn test_firmwares_by_model() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-center/firmwares/by-model"))
        .and(query_param("deviceModelId", "m1"))
        .respond_with(ok(json!({ "items": [], "total": 0 })))
        .mount(&server)
        .await;

    let page = client.firmwares_by_model("m1").await.unwrap();
    assert!(page.items.is_empty());
}

// ── Hub URL ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hub_url_uses_websocket_scheme() {
    let (server, client) = setup().await;
    let hub = client.hub_url().unwrap();
    assert_eq!(hub.scheme(), "ws");
    assert_eq!(hub.path(), "/data-center/device-events");
    drop(server);
}

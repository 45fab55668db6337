//! Tests d'intégration de l'API HTTP de zigmon
//!
//! Construit un vrai routeur sur un store alimenté à la main, puis envoie
//! les requêtes via tower::ServiceExt, sans ouvrir de port.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use zigmon::http::{build_router, AppState};
use zigmon::store::DeviceStore;
use zigmon::{DeviceRecord, SharedStore};

fn record(id: u16, lqi: u8, rssi: i16) -> DeviceRecord {
    serde_json::from_str(&format!(
        r#"{{"name":"dev-{id}","id":{id},"profileId":260,"clusterId":1030,
            "sourceEndpoint":1,"destinationEndpoint":1,"groupId":0,"sequence":5,
            "lastHopLqi":{lqi},"lastHopRssi":{rssi},
            "time":"2026-08-20 10:15:30.123456","type":"zigbeeRx"}}"#
    ))
    .unwrap()
}

fn test_app(records: Vec<DeviceRecord>) -> (tempfile::TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let store: SharedStore = Arc::new(
        DeviceStore::new(dir.path().join("data.json"))
            .with_flush_interval(Duration::from_secs(3600)),
    );
    for record in records {
        store.upsert(record);
    }
    (dir, build_router(AppState { store }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

// ---------------------------------------------------------------
// /health
// ---------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let (_dir, app) = test_app(vec![]);
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

// ---------------------------------------------------------------
// /topN
// ---------------------------------------------------------------

#[tokio::test]
async fn test_top_n_ranks_weakest_links_first() {
    // Égalité de LQI : le RSSI départage, -60 avant -40
    let (_dir, app) = test_app(vec![
        record(1, 50, -60),
        record(2, 10, -80),
        record(3, 50, -40),
    ]);
    let json = get_json(app, "/topN?n=2").await;

    let ranked = json.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["id"], 2);
    assert_eq!(ranked[0]["lastHopLqi"], 10);
    assert_eq!(ranked[1]["id"], 1);
    assert_eq!(ranked[1]["lastHopRssi"], -60);
}

#[tokio::test]
async fn test_top_n_without_n_returns_everything() {
    let (_dir, app) = test_app(vec![
        record(1, 50, -60),
        record(2, 10, -80),
        record(3, 50, -40),
    ]);
    let json = get_json(app, "/topN").await;
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_top_n_view_carries_hub_fields_and_id_hex() {
    let (_dir, app) = test_app(vec![record(0x1A2B, 196, -51)]);
    let json = get_json(app, "/topN").await;

    let device = &json.as_array().unwrap()[0];
    assert_eq!(device["idHex"], "1A2B");
    assert_eq!(device["name"], "dev-6699");
    assert_eq!(device["profileId"], 260);
    assert_eq!(device["type"], "zigbeeRx");
    assert_eq!(device["time"], "2026-08-20 10:15:30.123456");
    // Les champs dérivés ne fuient pas sous d'autres noms
    assert!(device.get("dateTime").is_none());
    assert!(device.get("event_type").is_none());
}

#[tokio::test]
async fn test_top_n_excludes_device_zero() {
    let (_dir, app) = test_app(vec![record(0, 255, -30), record(9, 80, -70)]);
    let json = get_json(app, "/topN").await;

    let ranked = json.as_array().unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0]["id"], 9);
}

#[tokio::test]
async fn test_top_n_rejects_non_numeric_count() {
    let (_dir, app) = test_app(vec![record(1, 50, -60)]);
    let (status, body) = get(app, "/topN?n=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Invalid count 'abc'. Expected an integer."
    );
}

#[tokio::test]
async fn test_top_n_tile_is_one_line_per_device() {
    let (_dir, app) = test_app(vec![record(0x1001, 50, -60), record(0x1002, 10, -80)]);
    let (status, body) = get(app, "/topN?format=tile").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    // Lien le plus faible en premier
    assert_eq!(lines[0], "1002 dev-4098 lqi=10 rssi=-80");
    assert_eq!(lines[1], "1001 dev-4097 lqi=50 rssi=-60");
}

// ---------------------------------------------------------------
// /stats
// ---------------------------------------------------------------

#[tokio::test]
async fn test_stats_empty_store_is_empty_body() {
    let (_dir, app) = test_app(vec![]);
    let (status, body) = get(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_stats_json_shape() {
    let (_dir, app) = test_app(vec![
        record(1, 10, -70),
        record(2, 20, -60),
        record(3, 30, -50),
        record(4, 40, -40),
    ]);
    let json = get_json(app, "/stats").await;

    assert_eq!(json["devicesTotal"], 4);
    assert_eq!(json["lqi"]["min"], 10);
    // Effectif pair : moyenne plancher des deux valeurs centrales
    assert_eq!(json["lqi"]["median"], 25);
    assert_eq!(json["lqi"]["max"], 40);
    assert_eq!(json["rssi"]["min"], -70);
    assert_eq!(json["rssi"]["median"], -55);
    assert_eq!(json["rssi"]["max"], -40);
    // Les relevés de 2026-08-20 sont anciens au moment du test
    assert_eq!(json["devicesLast24h"], 0);
    assert_eq!(json["devicesLast7d"], 0);
    assert_eq!(json["lastSeen"], "2026-08-20 10:15:30");
}

#[tokio::test]
async fn test_stats_excludes_device_zero() {
    let (_dir, app) = test_app(vec![record(0, 255, -30), record(5, 80, -70)]);
    let json = get_json(app, "/stats").await;

    assert_eq!(json["devicesTotal"], 1);
    assert_eq!(json["lqi"]["min"], 80);
    assert_eq!(json["lqi"]["max"], 80);
}

#[tokio::test]
async fn test_stats_tile_summarises_the_mesh() {
    let (_dir, app) = test_app(vec![record(1, 10, -70), record(2, 30, -50)]);
    let (status, body) = get(app, "/stats?format=tile").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "LQI 10/20/30");
    assert_eq!(lines[1], "RSSI -70/-60/-50");
    assert_eq!(lines[2], "2 devices, 0 <24h, 0 <7d");
    assert_eq!(lines[3], "last seen 2026-08-20 10:15:30");
}

// ---------------------------------------------------------------
// Sélecteur de format
// ---------------------------------------------------------------

#[tokio::test]
async fn test_unknown_format_is_rejected_everywhere() {
    for uri in ["/topN?format=xml", "/stats?format=xml"] {
        let (_dir, app) = test_app(vec![record(1, 50, -60)]);
        let (status, body) = get(app, uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"Invalid format 'xml'. Valid formats: ["json", "tile"]"#
        );
    }
}

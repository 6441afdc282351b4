//! Integration tests for the JSON API
//!
//! Drive the full router (cache over in-memory SQLite) through create,
//! resolve, list, image, delete and validation paths.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use scanlink::analytics::DisabledGeoLookup;
use scanlink::api::create_api_router;
use scanlink::config::*;
use scanlink::storage::{CachedStorage, SqliteStorage, Storage};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(CachedStorage::new(Arc::new(storage), 1000, 60))
}

/// Helper to create test config
fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig {
            backend: DatabaseBackend::Sqlite,
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        },
        api_server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
        },
        redirect_server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
        },
        domains: DomainConfig {
            frontend_domain: "https://qr.example.com".to_string(),
            backend_domain: "https://api.example.com".to_string(),
        },
        allocation: AllocationConfig::default(),
        cache: CacheConfig::default(),
        analytics: AnalyticsConfig::default(),
    }
}

async fn create_test_app() -> Router {
    create_api_router(
        create_test_storage().await,
        &create_test_config(),
        Arc::new(DisabledGeoLookup),
    )
    .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_link(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, post_json("/api/generate", body)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {json}");
    json
}

fn decode_png(encoded: &Value) -> Vec<u8> {
    STANDARD.decode(encoded.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_create_then_resolve_url() {
    let app = create_test_app().await;

    let created = create_link(
        &app,
        json!({
            "url": "https://example.com",
            "color": "#000000",
            "bg_color": "#ffffff",
            "box_size": 10,
            "border": 4
        }),
    )
    .await;

    let id = created["qr_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

    let short_url = created["short_url"].as_str().unwrap();
    assert_eq!(short_url, format!("https://qr.example.com/r/{id}"));
    assert_eq!(created["redirect_url"], created["short_url"]);
    assert!(decode_png(&created["qr_image_base64"]).starts_with(PNG_MAGIC));

    let (status, resolved) = send(&app, get(&format!("/api/redirect/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved, json!({"type": "url", "content": "https://example.com"}));
}

#[tokio::test]
async fn test_text_content_resolves_as_text() {
    let app = create_test_app().await;

    let created = create_link(&app, json!({"url": "  Wi-Fi password: hunter2  "})).await;
    let id = created["qr_id"].as_str().unwrap();

    let (status, resolved) = send(&app, get(&format!("/api/redirect/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["type"], "text");
    assert_eq!(resolved["content"], "Wi-Fi password: hunter2");
}

#[tokio::test]
async fn test_list_and_get_include_style() {
    let app = create_test_app().await;

    let first = create_link(&app, json!({"url": "https://a.example.com", "color": "red"})).await;
    create_link(&app, json!({"url": "https://b.example.com", "box_size": "12"})).await;

    let (status, list) = send(&app, get("/api/qrcodes")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert!(entry["created_at"].as_str().unwrap().ends_with('Z'));
        assert!(entry["original_url"].as_str().unwrap().starts_with("https://"));
    }

    let id = first["qr_id"].as_str().unwrap();
    let (status, entry) = send(&app, get(&format!("/api/qrcodes/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["id"], id);
    assert_eq!(entry["color"], "red");
    assert_eq!(entry["bg_color"], "white");
    assert_eq!(entry["box_size"], 10);
    assert_eq!(entry["border"], 4);
}

#[tokio::test]
async fn test_image_variants() {
    let app = create_test_app().await;

    let created = create_link(&app, json!({"url": "https://example.com/landing"})).await;
    let id = created["qr_id"].as_str().unwrap();

    let (status, original) = send(&app, get(&format!("/api/qrcode-image/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, redirect) =
        send(&app, get(&format!("/api/qrcode-image/{id}?redirect=true"))).await;
    assert_eq!(status, StatusCode::OK);

    let original = decode_png(&original["qr_image_base64"]);
    let redirect = decode_png(&redirect["qr_image_base64"]);
    assert!(original.starts_with(PNG_MAGIC));
    assert!(redirect.starts_with(PNG_MAGIC));
    assert_ne!(original, redirect);

    // The redirect variant is what the create call returned
    assert_eq!(redirect, decode_png(&created["qr_image_base64"]));
}

#[tokio::test]
async fn test_delete_makes_link_unreachable() {
    let app = create_test_app().await;

    let created = create_link(&app, json!({"url": "https://example.com"})).await;
    let id = created["qr_id"].as_str().unwrap();

    // Populate the resolve cache before deleting
    let (status, _) = send(&app, get(&format!("/api/redirect/{id}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, delete(&format!("/api/qrcodes/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    for uri in [
        format!("/api/redirect/{id}"),
        format!("/api/qrcodes/{id}"),
        format!("/api/qrcode-image/{id}"),
        format!("/api/stats/{id}"),
    ] {
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "QR code not found");
    }

    let (status, _) = send(&app, delete(&format!("/api/qrcodes/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, get("/api/qrcodes")).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = create_test_app().await;

    let cases = [
        json!({"url": ""}),
        json!({"url": "   "}),
        json!({"color": "black"}),
        json!({"url": "https://example.com", "color": "not-a-color"}),
        json!({"url": "https://example.com", "bg_color": "#12345"}),
        json!({"url": "https://example.com", "box_size": 0}),
        json!({"url": "https://example.com", "border": 21}),
    ];

    for case in cases {
        let (status, body) = send(&app, post_json("/api/generate", case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert!(body["error"].is_string(), "{case}");
    }

    // Nothing was persisted by the rejected requests
    let (_, list) = send(&app, get("/api/qrcodes")).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_content_too_long_for_qr_is_rejected() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/generate", json!({"url": "a".repeat(2000)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("QR code"));

    let (status, _) = send(
        &app,
        post_json(
            "/api/generate",
            json!({"url": "a".repeat(1200), "box_size": 50, "border": 20}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Content at the limit still yields both image variants
    let created = create_link(&app, json!({"url": "a".repeat(1000), "box_size": 2})).await;
    let id = created["qr_id"].as_str().unwrap();
    let (status, direct) = send(&app, get(&format!("/api/qrcode-image/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(decode_png(&direct["qr_image_base64"]).starts_with(PNG_MAGIC));

    let (_, list) = send(&app, get("/api/qrcodes")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let app = create_test_app().await;

    let (status, body) = send(&app, get("/api/redirect/nope1234")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "QR code not found"}));
}

#[tokio::test]
async fn test_config_and_health() {
    let app = create_test_app().await;

    let (status, config) = send(&app, get("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        config,
        json!({
            "BACKEND_DOMAIN": "https://api.example.com",
            "FRONTEND_DOMAIN": "https://qr.example.com"
        })
    );

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let app = create_test_app().await;

    let mut handles = vec![];
    for i in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            create_link(&app, json!({"url": format!("https://example.com/{i}")})).await
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let created = handle.await.unwrap();
        assert!(ids.insert(created["qr_id"].as_str().unwrap().to_string()));
    }

    let (_, list) = send(&app, get("/api/qrcodes")).await;
    assert_eq!(list.as_array().unwrap().len(), 20);
}

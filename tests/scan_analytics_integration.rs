//! Integration tests for scan recording and statistics
//!
//! Scans are recorded through `/api/record-scan` and read back through
//! `/api/stats/{id}`; every recorded scan must be visible immediately.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use scanlink::analytics::{GeoLookup, GeoLookupError};
use scanlink::api::create_api_router;
use scanlink::config::*;
use scanlink::models::Country;
use scanlink::storage::{CachedStorage, MemoryStorage, SqliteStorage, Storage};
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Maps 203.0.113.0/24 to Germany; everything else is not in the database
struct TestGeo;

impl GeoLookup for TestGeo {
    fn country(&self, ip: IpAddr) -> Result<Country, GeoLookupError> {
        match ip {
            IpAddr::V4(v4) if matches!(v4.octets(), [203, 0, 113, _]) => Ok(Country::from_iso("DE")),
            _ => Err(GeoLookupError::NotFound(ip)),
        }
    }

    fn name(&self) -> &'static str {
        "test"
    }
}

fn create_test_config(analytics: AnalyticsConfig) -> Config {
    Config {
        database: DatabaseConfig {
            backend: DatabaseBackend::Memory,
            url: String::new(),
            max_connections: 1,
        },
        api_server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
        },
        redirect_server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
        },
        domains: DomainConfig::default(),
        allocation: AllocationConfig::default(),
        cache: CacheConfig::default(),
        analytics,
    }
}

fn create_app(storage: Arc<dyn Storage>, analytics: AnalyticsConfig, peer: [u8; 4]) -> Router {
    create_api_router(storage, &create_test_config(analytics), Arc::new(TestGeo))
        .layer(MockConnectInfo(SocketAddr::from((peer, 40000))))
}

fn memory_app() -> Router {
    create_app(
        Arc::new(MemoryStorage::new()),
        AnalyticsConfig::default(),
        [127, 0, 0, 1],
    )
}

async fn sqlite_app() -> Router {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    create_app(
        Arc::new(CachedStorage::new(Arc::new(storage), 1000, 60)),
        AnalyticsConfig::default(),
        [127, 0, 0, 1],
    )
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

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_link(app: &Router) -> String {
    let (status, created) = send(
        app,
        post_json("/api/generate", json!({"url": "https://example.com/menu"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    created["qr_id"].as_str().unwrap().to_string()
}

async fn record(app: &Router, id: &str, user_agent: Option<&str>) -> StatusCode {
    let body = match user_agent {
        Some(ua) => json!({"qr_id": id, "user_agent": ua}),
        None => json!({"qr_id": id}),
    };
    send(app, post_json("/api/record-scan", body)).await.0
}

async fn stats(app: &Router, id: &str) -> Value {
    let request = Request::builder()
        .uri(format!("/api/stats/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn test_stats_without_scans_are_zero() {
    let app = memory_app();
    let id = create_link(&app).await;

    let snapshot = stats(&app, &id).await;
    assert_eq!(snapshot["total"], 0);
    assert_eq!(snapshot["by_date"], json!({}));
    assert_eq!(snapshot["devices"]["mobile"], 0);
    assert_eq!(snapshot["devices"]["desktop"], 0);
    assert_eq!(snapshot["locations"], json!({}));
}

#[tokio::test]
async fn test_mobile_scans_counted() {
    let app = sqlite_app().await;
    let id = create_link(&app).await;

    assert_eq!(record(&app, &id, Some(IPHONE_UA)).await, StatusCode::OK);
    assert_eq!(record(&app, &id, Some(IPHONE_UA)).await, StatusCode::OK);
    assert_eq!(record(&app, &id, Some(DESKTOP_UA)).await, StatusCode::OK);
    assert_eq!(record(&app, &id, None).await, StatusCode::OK);

    let snapshot = stats(&app, &id).await;
    assert_eq!(snapshot["total"], 4);
    assert_eq!(snapshot["devices"]["mobile"], 2);
    assert_eq!(snapshot["devices"]["desktop"], 1);
    assert_eq!(snapshot["devices"]["unknown"], 1);
    assert_eq!(snapshot["by_date"].as_object().unwrap().len(), 1);
    assert_eq!(snapshot["by_date"][today()], 4);
    // Loopback is not in the test database
    assert_eq!(snapshot["locations"], json!({"Unknown": 4}));
}

#[tokio::test]
async fn test_concurrent_records_are_all_counted() {
    for app in [memory_app(), sqlite_app().await] {
        let id = create_link(&app).await;
        let n = 50;

        let mut handles = vec![];
        for i in 0..n {
            let app = app.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let ua = if i % 2 == 0 { IPHONE_UA } else { DESKTOP_UA };
                record(&app, &id, Some(ua)).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        let snapshot = stats(&app, &id).await;
        assert_eq!(snapshot["total"], n);
        assert_eq!(snapshot["devices"]["mobile"], n / 2);
        assert_eq!(snapshot["devices"]["desktop"], n / 2);
        assert_eq!(snapshot["by_date"][today()], n);
    }
}

#[tokio::test]
async fn test_record_unknown_link_is_not_found() {
    let app = memory_app();

    assert_eq!(
        record(&app, "missing1", Some(IPHONE_UA)).await,
        StatusCode::NOT_FOUND
    );

    let (status, _) = send(&app, post_json("/api/record-scan", json!({"qr_id": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/record-scan", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_after_delete_is_not_found() {
    let app = sqlite_app().await;
    let id = create_link(&app).await;
    assert_eq!(record(&app, &id, Some(DESKTOP_UA)).await, StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/qrcodes/{id}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    assert_eq!(
        record(&app, &id, Some(DESKTOP_UA)).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_country_from_trusted_forwarded_for() {
    let analytics = AnalyticsConfig {
        trusted_proxy_mode: TrustedProxyMode::Standard,
        trusted_proxies: vec!["10.0.0.0/8".parse().unwrap()],
        ..AnalyticsConfig::default()
    };
    let app = create_app(Arc::new(MemoryStorage::new()), analytics, [10, 0, 0, 2]);
    let id = create_link(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/record-scan")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.50, 10.0.0.9")
        .body(Body::from(
            json!({"qr_id": id, "user_agent": IPHONE_UA}).to_string(),
        ))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    // The body cannot choose the source IP
    let (status, _) = send(
        &app,
        post_json(
            "/api/record-scan",
            json!({"qr_id": id, "user_agent": IPHONE_UA, "ip": "203.0.113.1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let snapshot = stats(&app, &id).await;
    assert_eq!(snapshot["total"], 2);
    assert_eq!(snapshot["locations"], json!({"DE": 1, "Unknown": 1}));
}

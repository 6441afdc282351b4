use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::analytics::{GeoLookup, ScanRecorder, StatsAggregator, UserAgentClassifier};
use crate::config::Config;
use crate::links::LinkService;
use crate::redirect::Resolver;
use crate::render::PngQrRenderer;
use crate::storage::Storage;

use super::analytics::{link_stats, record_scan};
use super::handlers::{
    delete_link, generate, get_link, health_check, link_image, list_links, public_config,
    resolve_link, AppState,
};

pub fn create_api_router(
    storage: Arc<dyn Storage>,
    config: &Config,
    geo: Arc<dyn GeoLookup>,
) -> Router {
    let state = Arc::new(AppState {
        links: LinkService::new(
            Arc::clone(&storage),
            Arc::new(PngQrRenderer),
            config.allocation.clone(),
            config.domains.clone(),
        ),
        resolver: Resolver::new(Arc::clone(&storage)),
        recorder: ScanRecorder::new(
            Arc::clone(&storage),
            Arc::new(UserAgentClassifier::new()),
            geo,
        ),
        stats: StatsAggregator::new(storage),
        analytics: config.analytics.clone(),
    });

    let api_routes = Router::new()
        .route("/generate", post(generate))
        .route("/qrcodes", get(list_links))
        .route("/qrcodes/{id}", get(get_link).delete(delete_link))
        .route("/qrcode-image/{id}", get(link_image))
        .route("/redirect/{id}", get(resolve_link))
        .route("/record-scan", post(record_scan))
        .route("/stats/{id}", get(link_stats))
        .route("/config", get(public_config))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors_layer(&config.domains.frontend_domain))
        .layer(TraceLayer::new_for_http())
}

/// Allow the configured frontend origin only
fn cors_layer(frontend_domain: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_domain.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!("FRONTEND_DOMAIN '{}' is not a valid origin; CORS disabled", frontend_domain);
            layer
        }
    }
}

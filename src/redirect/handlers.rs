use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::middleware::RequestStart;
use super::resolver::Resolver;
use crate::error::ServiceError;
use crate::models::ContentKind;

pub struct RedirectState {
    pub resolver: Resolver,
    /// Where unknown ids are sent instead of a bare 404
    pub fallback_url: String,
}

/// Browser-facing redirect for a scanned code
pub async fn redirect_link(
    State(state): State<Arc<RedirectState>>,
    Path(id): Path<String>,
    Extension(RequestStart(request_start)): Extension<RequestStart>,
) -> impl IntoResponse {
    let handler_start = Instant::now();

    match state.resolver.resolve(&id).await {
        Ok(resolution) => {
            let mut response_headers = HeaderMap::new();
            response_headers.insert(
                "x-scanlink-cache-hit",
                HeaderValue::from_static(if resolution.cache_hit { "true" } else { "false" }),
            );
            response_headers.insert(
                "x-scanlink-timing-handler-ms",
                HeaderValue::from(handler_start.elapsed().as_millis() as u64),
            );
            response_headers.insert(
                "x-scanlink-timing-queue-ms",
                HeaderValue::from(handler_start.duration_since(request_start).as_millis() as u64),
            );

            match resolution.target.kind {
                ContentKind::Url => {
                    // Percent-encode anything the Location header cannot carry
                    let location = url::Url::parse(&resolution.target.content)
                        .map(String::from)
                        .unwrap_or(resolution.target.content);
                    (response_headers, found(&location)).into_response()
                }
                ContentKind::Text => {
                    response_headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/plain; charset=utf-8"),
                    );
                    (StatusCode::OK, response_headers, resolution.target.content).into_response()
                }
            }
        }
        Err(ServiceError::NotFound) => {
            tracing::debug!(link_id = %id, "unknown short code, sending to fallback");
            found(&state.fallback_url)
        }
        Err(e) => {
            tracing::error!(link_id = %id, error = %e, "redirect lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// 302 Found pointing at `location`
fn found(location: &str) -> Response {
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::warn!(location, "stored URL is not a valid Location header");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

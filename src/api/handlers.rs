use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{body_rejection, service_error, ApiError, SuccessResponse};
use crate::analytics::{ScanRecorder, StatsAggregator};
use crate::config::AnalyticsConfig;
use crate::links::LinkService;
use crate::models::{
    CreateLinkRequest, CreateLinkResponse, ImageQuery, ImageResponse, LinkSummary, ResolveResponse,
};
use crate::redirect::Resolver;

pub struct AppState {
    pub links: LinkService,
    pub resolver: Resolver,
    pub recorder: ScanRecorder,
    pub stats: StatsAggregator,
    pub analytics: AnalyticsConfig,
}

/// Create a link and render its redirect QR image
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<Json<CreateLinkResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let created = state.links.create(&request).await.map_err(service_error)?;

    Ok(Json(CreateLinkResponse {
        qr_id: created.link.id,
        qr_image_base64: created.qr_image_base64,
        redirect_url: created.short_url.clone(),
        short_url: created.short_url,
    }))
}

/// All links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkSummary>>, ApiError> {
    let links = state.links.list().await.map_err(service_error)?;
    Ok(Json(links.iter().map(LinkSummary::from).collect()))
}

pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LinkSummary>, ApiError> {
    let link = state.links.get(&id).await.map_err(service_error)?;
    Ok(Json(LinkSummary::from(&link)))
}

/// Delete a link and its scan history; the id is never handed out again
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.links.delete(&id).await.map_err(service_error)?;
    Ok(Json(SuccessResponse {
        message: "QR code deleted successfully".to_string(),
    }))
}

/// Re-render the image of a link. `?redirect=true` encodes the short URL,
/// otherwise the original content is encoded.
pub async fn link_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<ImageResponse>, ApiError> {
    let qr_image_base64 = state
        .links
        .image(&id, query.redirect_variant())
        .await
        .map_err(service_error)?;
    Ok(Json(ImageResponse { qr_image_base64 }))
}

/// Resolution for the frontend scan page. Does not record a scan.
pub async fn resolve_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let resolution = state.resolver.resolve(&id).await.map_err(service_error)?;
    Ok(Json(resolution.target))
}

#[derive(Serialize)]
pub struct PublicConfig {
    #[serde(rename = "BACKEND_DOMAIN")]
    pub backend_domain: String,
    #[serde(rename = "FRONTEND_DOMAIN")]
    pub frontend_domain: String,
}

pub async fn public_config(State(state): State<Arc<AppState>>) -> Json<PublicConfig> {
    let domains = state.links.domains();
    Json(PublicConfig {
        backend_domain: domains.backend_domain.clone(),
        frontend_domain: domains.frontend_domain.clone(),
    })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SuccessResponse {
            message: "OK".to_string(),
        }),
    )
}

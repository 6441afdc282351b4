//! Scan recording and statistics endpoints

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::HeaderMap,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::error::{body_rejection, service_error, ApiError, SuccessResponse};
use super::handlers::AppState;
use crate::analytics::extract_client_ip;
use crate::error::ServiceError;
use crate::models::{RecordScanRequest, StatsSnapshot};

/// Record one scan of a link.
///
/// The source IP comes from the connection (and trusted proxy headers), never
/// from the body. A missing `user_agent` records an unknown device.
pub async fn record_scan(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<RecordScanRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;

    let qr_id = request.qr_id.trim();
    if qr_id.is_empty() {
        return Err(service_error(ServiceError::Validation(
            "Missing 'qr_id' parameter".to_string(),
        )));
    }

    let user_agent = request
        .user_agent
        .as_deref()
        .filter(|ua| !ua.trim().is_empty());

    let source_ip = extract_client_ip(&headers, addr.ip(), &state.analytics);

    match state.recorder.record(qr_id, user_agent, source_ip).await {
        Ok(_) => Ok(Json(SuccessResponse {
            message: "Scan recorded".to_string(),
        })),
        Err(ServiceError::NotFound) => {
            tracing::warn!(link_id = %qr_id, "scan reported for unknown link");
            Err(service_error(ServiceError::NotFound))
        }
        Err(e) => Err(service_error(e)),
    }
}

pub async fn link_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatsSnapshot>, ApiError> {
    let snapshot = state.stats.stats(&id).await.map_err(service_error)?;
    Ok(Json(snapshot))
}

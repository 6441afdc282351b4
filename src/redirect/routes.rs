use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::storage::Storage;

use super::handlers::{health_check, redirect_link, RedirectState};
use super::middleware::record_request_start;
use super::resolver::Resolver;

pub fn create_redirect_router(storage: Arc<dyn Storage>, fallback_url: String) -> Router {
    let state = Arc::new(RedirectState {
        resolver: Resolver::new(storage),
        fallback_url,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/r/{id}", get(redirect_link))
        .layer(middleware::from_fn(record_request_start))
        .with_state(state)
}

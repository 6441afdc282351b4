use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// When the redirect server first saw the request
#[derive(Copy, Clone)]
pub struct RequestStart(pub Instant);

/// Stamp the request start and report end-to-end time on the response
pub async fn record_request_start(mut request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    request.extensions_mut().insert(RequestStart(start));

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "x-scanlink-timing-total-ms",
        HeaderValue::from(start.elapsed().as_millis() as u64),
    );
    response
}

//! Request activity tracking.
//!
//! Counts every request as activity for the idle policy and records
//! request metrics.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn track_activity(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let _in_flight = state.idle.as_ref().map(|tracker| tracker.request_started());

    let response = next.run(request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

//! Forced HTTPS redirects.
//!
//! Behind a TLS-terminating proxy, requests that arrived over plain HTTP
//! carry `X-Forwarded-Proto: http`. When forced redirects are enabled those
//! requests are answered with `308 Permanent Redirect` to the `https` URL.
//! The health endpoint is never redirected.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::{AppState, HEALTH_PATH};

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn https_redirect(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.options.force_https_redirects() || request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    match redirect_location(&request) {
        Some(location) => {
            tracing::debug!(location = %location, "Redirecting to https");
            (StatusCode::PERMANENT_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        None => next.run(request).await,
    }
}

/// The https URL for a request that came in over plain http.
fn redirect_location(request: &Request<Body>) -> Option<String> {
    let proto = request.headers().get(X_FORWARDED_PROTO)?.to_str().ok()?;
    if !proto.trim().eq_ignore_ascii_case("http") {
        return None;
    }

    let host = request.headers().get(header::HOST)?.to_str().ok()?;
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Some(format!("https://{}{}", host, path))
}

//! HTTP server for the node.
//!
//! # Responsibilities
//! - Bind the configured listen address
//! - Create the Axum Router with the node endpoints
//! - Wire up middleware (tracing, request ID, activity, https redirects)
//! - Probe the hooks server before serving
//! - Drain connections when asked to shut down

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::NodeConfig;
use crate::health::{HealthStatus, HooksHealthCheck};
use crate::http::middleware::{https_redirect, track_activity};
use crate::lifecycle::{
    IdleTracker, RunContext, RuntimeError, ServerRuntime, StartupError, StartupOptions,
};

pub const HEALTH_PATH: &str = "/health";
pub const INTROSPECT_PATH: &str = "/introspect";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NodeConfig>,
    pub options: Arc<StartupOptions>,
    pub idle: Option<IdleTracker>,
}

/// The node's server runtime.
pub struct NodeServer {
    config: Arc<NodeConfig>,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    stop: CancellationToken,
    drained: watch::Sender<bool>,
}

impl NodeServer {
    /// Bind the configured listen address.
    pub async fn bind(config: NodeConfig) -> Result<Self, StartupError> {
        let listener = TcpListener::bind(config.listen_addr).await.map_err(|e| {
            StartupError::Runtime(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| StartupError::Runtime(e.to_string()))?;

        tracing::info!(address = %local_addr, "Listener bound");

        let (drained, _) = watch::channel(false);
        Ok(Self {
            config: Arc::new(config),
            local_addr,
            listener: Mutex::new(Some(listener)),
            stop: CancellationToken::new(),
            drained,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn take_listener(&self) -> Option<TcpListener> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn has_started(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .route(INTROSPECT_PATH, get(introspect_handler))
            .fallback(not_found_handler)
            .layer(middleware::from_fn_with_state(state.clone(), https_redirect))
            .layer(middleware::from_fn_with_state(state.clone(), track_activity))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .with_state(state)
    }

    async fn check_hooks_server(&self, ctx: &RunContext) -> Result<(), RuntimeError> {
        let Some(timeout) = ctx.options.hooks_health_check() else {
            return Ok(());
        };
        let Some(server_url) = self.config.server_url.as_ref() else {
            tracing::warn!("Hooks health check enabled but no server URL is configured");
            return Ok(());
        };

        let check = HooksHealthCheck::new(server_url)
            .map_err(|e| RuntimeError::Failed(format!("invalid hooks health URL: {}", e)))?;
        if check.wait_until_healthy(timeout, &ctx.cancel).await == HealthStatus::Unhealthy {
            tracing::warn!(url = %check.url(), "Starting without a healthy hooks server");
        }
        Ok(())
    }
}

#[async_trait]
impl ServerRuntime for NodeServer {
    async fn run(&self, ctx: RunContext) -> Result<(), RuntimeError> {
        let listener = self
            .take_listener()
            .ok_or_else(|| RuntimeError::Failed("node is already running".into()))?;

        self.check_hooks_server(&ctx).await?;
        if ctx.cancel.is_cancelled() {
            self.drained.send_replace(true);
            return Ok(());
        }

        let idle = ctx.options.idle_timeout().map(IdleTracker::new);
        if let (Some(tracker), Some(on_idle)) = (idle.clone(), ctx.on_idle.clone()) {
            let cancel = ctx.cancel.clone();
            tokio::spawn(async move { tracker.watch(on_idle, cancel).await });
        }

        let state = AppState {
            config: self.config.clone(),
            options: ctx.options.clone(),
            idle,
        };
        let app = Self::build_router(state);

        tracing::info!(
            address = %self.local_addr,
            public_url = %self.config.public_node_url,
            idle_timeout = ?ctx.options.idle_timeout(),
            "Node listening"
        );

        let stop = self.stop.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await;

        self.drained.send_replace(true);
        result?;

        tracing::info!("Node stopped");
        Ok(())
    }

    async fn shutdown(&self, deadline: Duration) -> Result<(), RuntimeError> {
        self.stop.cancel();
        if !self.has_started() {
            return Ok(());
        }

        let mut drained = self.drained.subscribe();
        let in_time = tokio::time::timeout(deadline, async move {
            let _ = drained.wait_for(|done| *done).await;
        })
        .await
        .is_ok();

        if !in_time {
            tracing::warn!(
                deadline_secs = deadline.as_secs_f64(),
                "Connections still open at shutdown deadline"
            );
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionResponse {
    api_name: String,
    deployment_name: String,
    public_node_url: String,
    operations: Vec<String>,
    log_level: Option<String>,
    version: &'static str,
}

async fn introspect_handler(State(state): State<AppState>) -> Response {
    if !state.options.introspection() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let config = &state.config;
    Json(IntrospectionResponse {
        api_name: config.api_name.clone(),
        deployment_name: config.deployment_name.clone(),
        public_node_url: config.public_node_url.to_string(),
        operations: config.operations.clone(),
        log_level: config.log_level.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

async fn not_found_handler(State(state): State<AppState>, uri: Uri) -> Response {
    if state.options.debug_mode() {
        tracing::debug!(path = %uri.path(), "No handler for path");
        (StatusCode::NOT_FOUND, format!("no handler for {}", uri.path())).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

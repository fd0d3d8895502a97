//! Hooks server health probing.
//!
//! # Responsibilities
//! - Periodically probe the hooks server's health endpoint
//! - Give up once the configured timeout has elapsed

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Delay between two probes.
const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound for a single probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of waiting for the hooks server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Cancelled,
}

pub struct HooksHealthCheck {
    client: reqwest::Client,
    url: Url,
}

impl HooksHealthCheck {
    /// Probe `<server_url>/health`.
    pub fn new(server_url: &Url) -> Result<Self, url::ParseError> {
        let mut base = server_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            url: base.join("health")?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Probe once, waiting at most `timeout`.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let request = self
            .client
            .get(self.url.clone())
            .header("user-agent", "nodectl-health-check")
            .send();

        match time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(
                        url = %self.url,
                        status = %response.status(),
                        "Hooks health check failed: non-success status"
                    );
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    url = %self.url,
                    error = %e,
                    "Hooks health check failed: connection error"
                );
                false
            }
            Err(_) => {
                tracing::debug!(url = %self.url, "Hooks health check failed: timeout");
                false
            }
        }
    }

    /// Probe until the server is healthy, `timeout` elapses, or `cancel` fires.
    pub async fn wait_until_healthy(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> HealthStatus {
        tracing::info!(
            url = %self.url,
            timeout_secs = timeout.as_secs_f64(),
            "Waiting for hooks server"
        );

        let deadline = Instant::now() + timeout;
        let mut ticker = time::interval(PROBE_INTERVAL);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return HealthStatus::Cancelled,
                _ = time::sleep_until(deadline) => {
                    tracing::warn!(url = %self.url, "Hooks server is not healthy");
                    return HealthStatus::Unhealthy;
                }
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if self.probe(remaining.min(PROBE_TIMEOUT)).await {
                        tracing::info!(url = %self.url, "Hooks server is healthy");
                        return HealthStatus::Healthy;
                    }
                }
            }
        }
    }
}

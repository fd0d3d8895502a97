//! `node start` and `node url`.

use std::io::{self, Write};
use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::{load_configuration, ConfigError, ProjectDir, Settings};
use crate::http::NodeServer;
use crate::lifecycle::{
    Orchestrator, Outcome, SignalBridge, StartupError, StopLatch, TerminationSignal,
};
use crate::observability::metrics;

/// Errors that end a node command before the lifecycle decides the exit.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Start the node and run it until it stops.
pub async fn start(settings: &Settings) -> Result<Outcome, NodeError> {
    let bridge = SignalBridge::install(&TerminationSignal::DEFAULT).map_err(StartupError::Signals)?;
    let result = start_with_latch(settings, bridge.latch()).await;
    bridge.release();

    if let Some(signal) = bridge.signal_received() {
        tracing::debug!(signal = %signal, "Stopped by signal");
    }
    result
}

/// Start the node with an externally owned stop latch.
pub async fn start_with_latch(settings: &Settings, latch: StopLatch) -> Result<Outcome, NodeError> {
    if let Some(raw) = settings.observability.metrics_address.as_deref() {
        let addr: SocketAddr = raw
            .parse()
            .map_err(|_| NodeError::MetricsAddress(raw.to_string()))?;
        metrics::init_metrics(addr)?;
    }

    let project = ProjectDir::locate(&settings.project_dir)?;
    let config = load_configuration(project.path())?;

    tracing::info!(
        api_name = %config.api_name,
        deployment_name = %config.deployment_name,
        project_dir = %project.path().display(),
        "Starting node"
    );

    let server = NodeServer::bind(config).await?;
    let outcome = Orchestrator::new(server, settings.startup_options())
        .with_grace_period(settings.grace_period())
        .run(latch)
        .await;

    tracing::info!(
        state = %outcome.state,
        reason = outcome.signal.as_str(),
        "Node exited"
    );
    Ok(outcome)
}

/// Write the node's public URL followed by a newline.
///
/// Only the configuration is loaded; the node itself is never started.
pub fn url<W: Write>(settings: &Settings, out: &mut W) -> Result<(), NodeError> {
    let project = ProjectDir::locate(&settings.project_dir)?;
    let config = load_configuration(project.path())?;
    writeln!(out, "{}", config.public_node_url)?;
    out.flush()?;
    Ok(())
}

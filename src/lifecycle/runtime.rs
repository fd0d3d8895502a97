//! Interface between the orchestrator and the server runtime it supervises.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::startup::StartupOptions;

/// Callback the runtime invokes once its idle timeout elapses.
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

/// Everything the runtime receives when it is started.
#[derive(Clone)]
pub struct RunContext {
    /// Cancelled when the node is asked to stop or a sibling task fails.
    pub cancel: CancellationToken,
    /// Finalized startup options.
    pub options: Arc<StartupOptions>,
    /// Registered only when an idle timeout is configured.
    pub on_idle: Option<IdleCallback>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("options", &self.options)
            .field("on_idle", &self.on_idle.is_some())
            .finish()
    }
}

/// Errors returned by the server runtime while executing.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// I/O failure while serving.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A supervised task panicked or was aborted.
    #[error("task '{task}' did not complete: {reason}")]
    Task { task: String, reason: String },

    /// Any other runtime failure.
    #[error("{0}")]
    Failed(String),
}

/// A long-running service supervised by the orchestrator.
///
/// `run` blocks until the service stops, by error or after `shutdown`.
/// `shutdown` asks the service to drain in-flight work and returns once
/// it has finished or `deadline` has elapsed. The orchestrator is the only
/// caller of `shutdown` and calls it at most once.
#[async_trait]
pub trait ServerRuntime: Send + Sync + 'static {
    async fn run(&self, ctx: RunContext) -> Result<(), RuntimeError>;

    async fn shutdown(&self, deadline: Duration) -> Result<(), RuntimeError>;
}

//! Lifecycle orchestration.
//!
//! # States
//! ```text
//! Initializing → Running → Stopping → Stopped
//!                   │
//!                   └────→ Failed   (run returned an error, no stop requested)
//! ```
//!
//! # Exit policy
//! - Stop requested (signal or idle timeout): exit 0, even if `run` errors
//! - No stop requested and `run` errors: exit 1
//!
//! A runtime error that follows a requested stop is logged but does not
//! change the exit status.

use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::runtime::{IdleCallback, RunContext, RuntimeError, ServerRuntime};
use crate::lifecycle::shutdown::{LifecycleSignal, StopLatch};
use crate::lifecycle::startup::StartupOptions;
use crate::lifecycle::task_group::TaskGroup;
use crate::observability::metrics;

/// Default grace period given to the runtime to drain in-flight work.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initializing,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    fn as_gauge(self) -> f64 {
        match self {
            LifecycleState::Initializing => 0.0,
            LifecycleState::Running => 1.0,
            LifecycleState::Stopping => 2.0,
            LifecycleState::Stopped => 3.0,
            LifecycleState::Failed => 4.0,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final result of an orchestrated run.
#[derive(Debug)]
pub struct Outcome {
    /// Terminal state reached.
    pub state: LifecycleState,
    /// What stopped the node, if anything did.
    pub signal: LifecycleSignal,
    /// The runtime error, including one discarded by the exit policy.
    pub error: Option<RuntimeError>,
}

impl Outcome {
    /// Whether the process should exit successfully.
    pub fn is_success(&self) -> bool {
        self.state == LifecycleState::Stopped
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Drives a [`ServerRuntime`] from start to a deterministic exit decision.
pub struct Orchestrator<R: ServerRuntime> {
    runtime: Arc<R>,
    options: Arc<StartupOptions>,
    grace_period: Duration,
    state: watch::Sender<LifecycleState>,
}

impl<R: ServerRuntime> Orchestrator<R> {
    pub fn new(runtime: R, options: StartupOptions) -> Self {
        let (state, _) = watch::channel(LifecycleState::Initializing);
        Self {
            runtime: Arc::new(runtime),
            options: Arc::new(options),
            grace_period: DEFAULT_GRACE_PERIOD,
            state,
        }
    }

    /// Override the graceful shutdown deadline.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, next: LifecycleState) {
        publish(&self.state, next);
    }

    /// Run the runtime until it stops, then decide the outcome.
    ///
    /// `latch` is the single stop trigger shared with the signal bridge;
    /// its token is the context every supervised task observes.
    pub async fn run(self, latch: StopLatch) -> Outcome {
        let ctx = latch.token();
        let mut group = TaskGroup::new(&ctx);
        let group_token = group.token();
        // Cancelled by the runtime task once `run` has returned.
        let finished = CancellationToken::new();
        // Cancelled when the grace period ran out and `run` must be abandoned.
        let abandon = CancellationToken::new();

        let on_idle = self.options.idle_timeout().map(|timeout| {
            let latch = latch.clone();
            let cb: IdleCallback = Arc::new(move || {
                tracing::info!(
                    timeout_secs = timeout.as_secs(),
                    "Shutting down due to idle timeout"
                );
                latch.trigger(LifecycleSignal::IdleTimeoutRequestedStop);
            });
            cb
        });

        let run_ctx = RunContext {
            cancel: group_token.clone(),
            options: self.options.clone(),
            on_idle,
        };

        self.transition(LifecycleState::Running);

        {
            let runtime = self.runtime.clone();
            let done = group_token.clone();
            let finished = finished.clone();
            let abandon = abandon.clone();
            group.spawn("runtime", async move {
                let result = tokio::select! {
                    result = runtime.run(run_ctx) => result,
                    _ = abandon.cancelled() => {
                        tracing::warn!(
                            "Runtime did not return before the shutdown deadline, abandoning it"
                        );
                        Ok(())
                    }
                };
                finished.cancel();
                // Nothing is left to wait for once the runtime has returned.
                done.cancel();
                result
            });
        }

        {
            let runtime = self.runtime.clone();
            let latch = latch.clone();
            let state = self.state.clone();
            let grace_period = self.grace_period;
            let wake = group_token.clone();
            group.spawn("shutdown", async move {
                wake.cancelled().await;
                if !latch.is_triggered() {
                    return Ok(());
                }

                publish(&state, LifecycleState::Stopping);
                tracing::info!(
                    reason = latch.signal().as_str(),
                    grace_period_secs = grace_period.as_secs_f64(),
                    "Graceful shutdown started"
                );

                let deadline = tokio::time::Instant::now() + grace_period;
                let drain = tokio::time::timeout_at(deadline, runtime.shutdown(grace_period));
                let result = match drain.await {
                    Ok(Ok(())) => {
                        tracing::info!("Runtime drained");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Runtime reported an error while shutting down");
                        Err(e)
                    }
                    Err(_) => {
                        tracing::warn!(
                            grace_period_secs = grace_period.as_secs_f64(),
                            "Graceful shutdown deadline elapsed"
                        );
                        Ok(())
                    }
                };

                // `run` may use what is left of the grace period to return.
                tokio::select! {
                    _ = finished.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
                abandon.cancel();
                result
            });
        }

        let result = group.wait().await;
        let signal = latch.signal();
        metrics::record_shutdown(signal.as_str());
        self.decide(signal, result)
    }

    fn decide(&self, signal: LifecycleSignal, result: Result<(), RuntimeError>) -> Outcome {
        let (state, error) = match (signal.is_stop_requested(), result) {
            (true, Ok(())) => (LifecycleState::Stopped, None),
            (true, Err(e)) => {
                tracing::warn!(
                    error = %e,
                    reason = signal.as_str(),
                    "Runtime returned an error after a requested stop; exiting cleanly"
                );
                (LifecycleState::Stopped, Some(e))
            }
            (false, Ok(())) => {
                tracing::warn!("Runtime exited without a stop request");
                (LifecycleState::Stopped, None)
            }
            (false, Err(e)) => {
                tracing::error!(error = %e, "Node process failed");
                (LifecycleState::Failed, Some(e))
            }
        };

        self.transition(state);
        Outcome { state, signal, error }
    }
}

fn publish(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let prev = state.send_replace(next);
    if prev != next {
        tracing::info!(from = %prev, to = %next, "Lifecycle transition");
        metrics::record_lifecycle_state(next.as_gauge());
    }
}

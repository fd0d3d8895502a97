//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings + flags → StartupOptions (immutable)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → StopLatch (shutdown.rs) → cancellation token
//!
//! Idle (idle.rs):
//!     No served requests for `idle_timeout` → idle callback → StopLatch
//!
//! Orchestration (orchestrator.rs):
//!     TaskGroup (task_group.rs) { runtime.run, wait → runtime.shutdown }
//!     → join all → exit decision
//! ```
//!
//! # Design Decisions
//! - One stop latch: signal and idle timeout share a single shutdown path
//! - Shutdown has a deadline: the runtime is abandoned after the grace period
//! - A stop that was requested always exits 0

pub mod idle;
pub mod orchestrator;
pub mod runtime;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod task_group;

pub use idle::{ActivityGuard, IdleTracker};
pub use orchestrator::{LifecycleState, Orchestrator, Outcome, DEFAULT_GRACE_PERIOD};
pub use runtime::{IdleCallback, RunContext, RuntimeError, ServerRuntime};
pub use shutdown::{LifecycleSignal, StopLatch};
pub use signals::{SignalBridge, TerminationSignal};
pub use startup::{StartupError, StartupOptions, StartupOptionsBuilder};
pub use task_group::TaskGroup;

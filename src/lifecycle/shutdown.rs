//! Shutdown coordination for the node.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Why the node is (or is not) stopping.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleSignal {
    /// No stop has been requested.
    #[default]
    RunningNormally = 0,
    /// An OS termination signal asked the node to stop.
    SignalRequestedStop = 1,
    /// The idle timeout elapsed without served requests.
    IdleTimeoutRequestedStop = 2,
}

impl LifecycleSignal {
    /// Whether this value represents a deliberate stop request.
    pub fn is_stop_requested(self) -> bool {
        self != LifecycleSignal::RunningNormally
    }

    /// Short label used for log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleSignal::RunningNormally => "running",
            LifecycleSignal::SignalRequestedStop => "signal",
            LifecycleSignal::IdleTimeoutRequestedStop => "idle_timeout",
        }
    }
}

impl From<u8> for LifecycleSignal {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleSignal::SignalRequestedStop,
            2 => LifecycleSignal::IdleTimeoutRequestedStop,
            _ => LifecycleSignal::RunningNormally,
        }
    }
}

impl fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleSignal::RunningNormally => write!(f, "running normally"),
            LifecycleSignal::SignalRequestedStop => write!(f, "stop requested by signal"),
            LifecycleSignal::IdleTimeoutRequestedStop => {
                write!(f, "stop requested by idle timeout")
            }
        }
    }
}

/// Single-fire stop latch.
///
/// Every stop trigger (signal, idle timeout) funnels through [`StopLatch::trigger`].
/// Only the first call records its [`LifecycleSignal`] and cancels the shared
/// token; every later call is a no-op. Cloning shares the same latch.
#[derive(Clone, Debug)]
pub struct StopLatch {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl StopLatch {
    /// Create an untriggered latch with a fresh cancellation token.
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a latch that cancels `token` when it fires.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleSignal::RunningNormally as u8)),
            token,
        }
    }

    /// Fire the latch.
    ///
    /// Returns `true` only for the call that actually initiated the stop.
    /// `RunningNormally` is not a stop request and never fires the latch.
    pub fn trigger(&self, signal: LifecycleSignal) -> bool {
        if !signal.is_stop_requested() {
            return false;
        }

        let fired = self
            .state
            .compare_exchange(
                LifecycleSignal::RunningNormally as u8,
                signal as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if fired {
            tracing::info!(reason = signal.as_str(), "Stop requested");
            self.token.cancel();
        } else {
            tracing::debug!(
                reason = signal.as_str(),
                first = self.signal().as_str(),
                "Stop already requested, ignoring trigger"
            );
        }
        fired
    }

    /// The signal recorded by the first trigger, or `RunningNormally`.
    pub fn signal(&self) -> LifecycleSignal {
        LifecycleSignal::from(self.state.load(Ordering::Acquire))
    }

    /// Whether the latch has fired.
    pub fn is_triggered(&self) -> bool {
        self.signal().is_stop_requested()
    }

    /// The token cancelled when the latch fires.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Default for StopLatch {
    fn default() -> Self {
        Self::new()
    }
}

//! OS signal handling.
//!
//! Turns SIGINT/SIGTERM (Ctrl-C on non-Unix platforms) into the cancellation
//! token every shutdown path observes. The first observed signal fires the
//! [`StopLatch`] with [`LifecycleSignal::SignalRequestedStop`].

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::shutdown::{LifecycleSignal, StopLatch};

/// Termination signals the bridge can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl TerminationSignal {
    /// The signals `node start` listens for.
    pub const DEFAULT: [TerminationSignal; 2] =
        [TerminationSignal::Interrupt, TerminationSignal::Terminate];
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Bridge from OS signals to the node's stop latch.
pub struct SignalBridge {
    latch: StopLatch,
    received: Arc<OnceLock<TerminationSignal>>,
    listeners: Mutex<Vec<AbortHandle>>,
}

impl SignalBridge {
    /// Register handlers for `signals` with a fresh stop latch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install(signals: &[TerminationSignal]) -> io::Result<Self> {
        Self::install_with_latch(signals, StopLatch::new())
    }

    /// Register handlers for `signals`, firing `latch` on the first one.
    pub fn install_with_latch(signals: &[TerminationSignal], latch: StopLatch) -> io::Result<Self> {
        let received = Arc::new(OnceLock::new());
        let mut listeners = Vec::with_capacity(signals.len());

        for &signal in signals {
            let wait = listen(signal)?;
            let latch = latch.clone();
            let received = received.clone();
            let handle = tokio::spawn(async move {
                wait.await;
                let _ = received.set(signal);
                tracing::info!(signal = %signal, "Received termination signal");
                latch.trigger(LifecycleSignal::SignalRequestedStop);
            });
            listeners.push(handle.abort_handle());
        }

        tracing::debug!(signals = ?signals, "Signal handlers registered");

        Ok(Self {
            latch,
            received,
            listeners: Mutex::new(listeners),
        })
    }

    /// Token cancelled the first time the latch fires.
    pub fn context(&self) -> CancellationToken {
        self.latch.token()
    }

    /// The stop latch fed by this bridge.
    pub fn latch(&self) -> StopLatch {
        self.latch.clone()
    }

    /// The signal that fired, if any.
    pub fn signal_received(&self) -> Option<TerminationSignal> {
        self.received.get().copied()
    }

    /// Abort the listener tasks. Safe to call any number of times.
    ///
    /// Tokio keeps its OS handlers registered for the life of the process,
    /// so after release these signals are received and dropped; they do not
    /// fall back to the default action.
    pub fn release(&self) {
        let listeners = {
            let mut guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        if listeners.is_empty() {
            return;
        }
        for handle in listeners {
            handle.abort();
        }
        tracing::debug!("Signal handlers released");
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn listen(signal: TerminationSignal) -> io::Result<impl std::future::Future<Output = ()> + Send> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let kind = match signal {
        TerminationSignal::Interrupt => SignalKind::interrupt(),
        TerminationSignal::Terminate => SignalKind::terminate(),
    };
    let mut stream = unix_signal(kind)?;
    Ok(async move {
        stream.recv().await;
    })
}

#[cfg(not(unix))]
fn listen(signal: TerminationSignal) -> io::Result<impl std::future::Future<Output = ()> + Send> {
    let interrupt = signal == TerminationSignal::Interrupt;
    if !interrupt {
        tracing::debug!(signal = %signal, "Signal not supported on this platform");
    }
    Ok(async move {
        if !interrupt {
            return std::future::pending::<()>().await;
        }
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
}

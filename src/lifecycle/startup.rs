//! Startup options and startup errors.
//!
//! # Responsibilities
//! - Assemble the immutable [`StartupOptions`] handed to the server runtime
//! - Classify fatal startup failures
//!
//! # Design Decisions
//! - Builder setters are independent; the last call for a field wins
//! - A zero idle timeout means the idle policy is disabled

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Options the server runtime is started with.
///
/// Built once through [`StartupOptions::builder`] and shared read-only
/// (usually as `Arc<StartupOptions>`) for the rest of the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupOptions {
    debug_mode: bool,
    force_https_redirects: bool,
    introspection: bool,
    pretty_logging: bool,
    idle_timeout: Option<Duration>,
    hooks_health_check: Option<Duration>,
}

impl StartupOptions {
    /// Start building options from the defaults.
    pub fn builder() -> StartupOptionsBuilder {
        StartupOptionsBuilder::default()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn force_https_redirects(&self) -> bool {
        self.force_https_redirects
    }

    pub fn introspection(&self) -> bool {
        self.introspection
    }

    pub fn pretty_logging(&self) -> bool {
        self.pretty_logging
    }

    /// Idle duration after which the node stops itself; `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Timeout for the hooks server health check; `None` when disabled.
    pub fn hooks_health_check(&self) -> Option<Duration> {
        self.hooks_health_check
    }
}

impl Default for StartupOptions {
    fn default() -> Self {
        StartupOptionsBuilder::default().build()
    }
}

/// Builder for [`StartupOptions`].
#[derive(Debug, Clone)]
pub struct StartupOptionsBuilder {
    debug_mode: bool,
    force_https_redirects: bool,
    introspection: bool,
    pretty_logging: bool,
    idle_timeout: Option<Duration>,
    hooks_health_check: Option<Duration>,
}

impl Default for StartupOptionsBuilder {
    fn default() -> Self {
        Self {
            debug_mode: false,
            force_https_redirects: true,
            introspection: false,
            pretty_logging: false,
            idle_timeout: None,
            hooks_health_check: None,
        }
    }
}

impl StartupOptionsBuilder {
    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    pub fn force_https_redirects(mut self, enabled: bool) -> Self {
        self.force_https_redirects = enabled;
        self
    }

    pub fn introspection(mut self, enabled: bool) -> Self {
        self.introspection = enabled;
        self
    }

    pub fn pretty_logging(mut self, enabled: bool) -> Self {
        self.pretty_logging = enabled;
        self
    }

    /// Stop the node after `timeout` without served requests. Zero disables it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Convenience for whole seconds, as taken from the command line.
    pub fn idle_timeout_secs(self, secs: u64) -> Self {
        self.idle_timeout(Duration::from_secs(secs))
    }

    /// Probe the hooks server before serving, waiting at most `timeout`.
    pub fn hooks_health_check(mut self, timeout: Option<Duration>) -> Self {
        self.hooks_health_check = timeout;
        self
    }

    pub fn build(self) -> StartupOptions {
        StartupOptions {
            debug_mode: self.debug_mode,
            force_https_redirects: self.force_https_redirects,
            introspection: self.introspection,
            pretty_logging: self.pretty_logging,
            idle_timeout: self.idle_timeout,
            hooks_health_check: self.hooks_health_check,
        }
    }
}

/// Fatal errors raised before the node is running.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The project directory does not exist or cannot be resolved.
    #[error("could not locate project directory '{}': {source}", .path.display())]
    ProjectDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The project path exists but is not a directory.
    #[error("project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The server runtime could not be constructed.
    #[error("could not create node: {0}")]
    Runtime(String),

    /// OS signal handlers could not be registered.
    #[error("could not register signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

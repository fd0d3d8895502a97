//! Operator settings for the node command.
//!
//! Settings come from an optional TOML file and are then overridden by
//! command line flags. They are built once per command invocation and
//! passed down explicitly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::StartupOptions;

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Root settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Project directory holding `generated/`.
    pub project_dir: PathBuf,

    pub logging: LoggingSettings,

    pub shutdown: ShutdownSettings,

    pub http: HttpSettings,

    pub health_check: HealthCheckSettings,

    pub observability: ObservabilitySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            logging: LoggingSettings::default(),
            shutdown: ShutdownSettings::default(),
            http: HttpSettings::default(),
            health_check: HealthCheckSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Debug mode: verbose logs and debug behaviour in the runtime.
    pub debug: bool,

    /// Human readable output instead of JSON.
    pub pretty: bool,

    /// Explicit filter directive, e.g. "nodectl=trace".
    pub level: Option<String>,
}

/// Shutdown settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownSettings {
    /// Grace period for draining in-flight work.
    pub graceful_timeout_secs: u64,

    /// Stop after this many seconds without served requests (0 = never).
    pub idle_shutdown_secs: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            graceful_timeout_secs: 10,
            idle_shutdown_secs: 0,
        }
    }
}

/// HTTP behaviour of the node.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub force_https_redirects: bool,

    pub introspection: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            force_https_redirects: true,
            introspection: false,
        }
    }
}

/// Hooks server health check.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckSettings {
    pub enabled: bool,

    pub timeout_secs: u64,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 10,
        }
    }
}

/// Metrics exposition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilitySettings {
    /// Address of the Prometheus endpoint; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Parse settings from TOML text; `path` is used for error reporting.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.graceful_timeout_secs)
    }

    /// Startup options for `node start`.
    pub fn startup_options(&self) -> StartupOptions {
        let hooks_health_check = self
            .health_check
            .enabled
            .then(|| Duration::from_secs(self.health_check.timeout_secs));

        StartupOptions::builder()
            .debug_mode(self.logging.debug)
            .force_https_redirects(self.http.force_https_redirects)
            .introspection(self.http.introspection)
            .pretty_logging(self.logging.pretty)
            .idle_timeout_secs(self.shutdown.idle_shutdown_secs)
            .hooks_health_check(hooks_health_check)
            .build()
    }
}

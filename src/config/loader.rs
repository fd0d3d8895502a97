//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ConfigDocument;
use crate::config::validation::{NodeConfig, ValidationError};
use crate::lifecycle::StartupError;

/// Directory, relative to the project, holding generated artifacts.
pub const GENERATED_DIR: &str = "generated";

/// File name of the generated configuration artifact.
pub const CONFIG_FILENAME: &str = "wundergraph.config.json";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find configuration file: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("config file is empty: {}", .path.display())]
    Empty { path: PathBuf },

    #[error("failed to unmarshal config file '{}': {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to create config from '{}': {}", .path.display(), join(.errors))]
    Construction {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A resolved project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    path: PathBuf,
}

impl ProjectDir {
    /// Resolve `path` to an existing directory.
    pub fn locate(path: &Path) -> Result<Self, StartupError> {
        let path = path.canonicalize().map_err(|source| StartupError::ProjectDir {
            path: path.to_path_buf(),
            source,
        })?;
        if !path.is_dir() {
            return Err(StartupError::NotADirectory(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Location of the generated configuration artifact under `dir`.
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(GENERATED_DIR).join(CONFIG_FILENAME)
}

/// Load the generated configuration of the project at `dir`.
pub fn load_configuration(dir: &Path) -> Result<NodeConfig, ConfigError> {
    let path = config_path(dir);

    if !path.is_file() {
        tracing::error!(file_path = %path.display(), "Configuration file not found");
        return Err(ConfigError::Missing { path });
    }

    let data = fs::read(&path).map_err(|source| {
        tracing::error!(file_path = %path.display(), error = %source, "Failed to read file");
        ConfigError::Unreadable {
            path: path.clone(),
            source,
        }
    })?;

    parse_configuration(&data, &path)
}

/// Decode and construct a configuration from the artifact's bytes.
///
/// `path` is only used for error reporting.
pub fn parse_configuration(data: &[u8], path: &Path) -> Result<NodeConfig, ConfigError> {
    let path = path.to_path_buf();

    if data.is_empty() {
        tracing::error!(file_path = %path.display(), "Config file is empty");
        return Err(ConfigError::Empty { path });
    }

    let document: ConfigDocument = serde_json::from_slice(data).map_err(|source| {
        tracing::error!(file_path = %path.display(), error = %source, "Failed to unmarshal");
        ConfigError::Malformed {
            path: path.clone(),
            source,
        }
    })?;

    let config = NodeConfig::from_document(document).map_err(|errors| {
        tracing::error!(
            file_path = %path.display(),
            errors = %join(&errors),
            "Failed to create config"
        );
        ConfigError::Construction {
            path: path.clone(),
            errors,
        }
    })?;

    tracing::debug!(
        file_path = %path.display(),
        api_name = %config.api_name,
        listen_addr = %config.listen_addr,
        operations = config.operations.len(),
        "Configuration loaded"
    );

    Ok(config)
}

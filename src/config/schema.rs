//! Schema of the generated configuration artifact.
//!
//! Mirrors the JSON document written by the code generator
//! (`generated/wundergraph.config.json`). Only the fields the node needs are
//! modelled; everything else in the document is ignored.

use serde::{Deserialize, Serialize};

/// Root of the generated configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Name of the generated API.
    #[serde(default)]
    pub api_name: String,

    /// Deployment the artifact was generated for.
    #[serde(default)]
    pub deployment_name: String,

    /// The user defined API. Missing when generation did not run to completion.
    #[serde(default)]
    pub api: Option<ApiDocument>,
}

/// The API section of the document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
    #[serde(default)]
    pub options: ApiOptions,

    #[serde(default)]
    pub operations: Vec<OperationDocument>,
}

/// Node options of the API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiOptions {
    #[serde(default)]
    pub listen: ListenOptions,

    /// URL clients use to reach the node.
    #[serde(default)]
    pub public_node_url: Option<String>,

    /// URL of the hooks server.
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub logger: Option<LoggerOptions>,
}

/// Address the node listens on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenOptions {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: PortValue,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> PortValue {
    PortValue::Number(9991)
}

/// A port given either as a number or as a string.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

/// Logger section of the API options.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggerOptions {
    #[serde(default)]
    pub level: Option<String>,
}

/// A single operation exposed by the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationDocument {
    pub name: String,
}

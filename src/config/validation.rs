//! Construction of the runtime configuration.
//!
//! # Responsibilities
//! - Turn a decoded [`ConfigDocument`] into a [`NodeConfig`]
//! - Resolve the listen address and parse every URL
//! - Reject documents the node cannot run with
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: ConfigDocument → Result<NodeConfig, Vec<ValidationError>>

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;
use url::Url;

use crate::config::schema::{ConfigDocument, PortValue};

/// Validated configuration the node runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub api_name: String,
    pub deployment_name: String,
    pub listen_addr: SocketAddr,
    pub public_node_url: Url,
    pub server_url: Option<Url>,
    pub operations: Vec<String>,
    pub log_level: Option<String>,
}

/// A single reason a document cannot become a [`NodeConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("could not get user defined api, try running code generation again")]
    MissingApi,

    #[error("invalid listen address '{host}:{port}': {reason}")]
    InvalidListenAddress {
        host: String,
        port: String,
        reason: String,
    },

    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("operation names must not be empty")]
    EmptyOperationName,

    #[error("operation '{0}' is defined more than once")]
    DuplicateOperation(String),
}

impl NodeConfig {
    /// Build a node configuration from a decoded document.
    pub fn from_document(doc: ConfigDocument) -> Result<Self, Vec<ValidationError>> {
        let Some(api) = doc.api else {
            return Err(vec![ValidationError::MissingApi]);
        };

        let mut errors = Vec::new();
        let options = api.options;

        let listen_addr = match resolve_listen(&options.listen.host, &options.listen.port) {
            Ok(addr) => Some(addr),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let public_node_url = match options.public_node_url.as_deref() {
            Some(raw) => parse_http_url("publicNodeUrl", raw)
                .map_err(|e| errors.push(e))
                .ok(),
            None => listen_addr.and_then(|addr| {
                let host = if addr.ip().is_unspecified() {
                    "localhost".to_string()
                } else {
                    addr.ip().to_string()
                };
                parse_http_url("publicNodeUrl", &format!("http://{}:{}", host, addr.port()))
                    .map_err(|e| errors.push(e))
                    .ok()
            }),
        };

        let server_url = match options.server_url.as_deref() {
            Some(raw) if !raw.is_empty() => parse_http_url("serverUrl", raw)
                .map_err(|e| errors.push(e))
                .ok(),
            _ => None,
        };

        let mut seen = HashSet::new();
        let mut operations = Vec::with_capacity(api.operations.len());
        for op in api.operations {
            if op.name.trim().is_empty() {
                errors.push(ValidationError::EmptyOperationName);
            } else if !seen.insert(op.name.clone()) {
                errors.push(ValidationError::DuplicateOperation(op.name));
            } else {
                operations.push(op.name);
            }
        }

        match (listen_addr, public_node_url) {
            (Some(listen_addr), Some(public_node_url)) if errors.is_empty() => Ok(NodeConfig {
                api_name: doc.api_name,
                deployment_name: doc.deployment_name,
                listen_addr,
                public_node_url,
                server_url,
                operations,
                log_level: options.logger.and_then(|l| l.level),
            }),
            _ => Err(errors),
        }
    }
}

fn resolve_listen(host: &str, port: &PortValue) -> Result<SocketAddr, ValidationError> {
    let port_str = match port {
        PortValue::Number(n) => n.to_string(),
        PortValue::Text(s) => s.clone(),
    };
    let invalid = |reason: String| ValidationError::InvalidListenAddress {
        host: host.to_string(),
        port: port_str.clone(),
        reason,
    };

    let port = match port {
        PortValue::Number(n) => *n,
        PortValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| invalid(format!("invalid port: {}", e)))?,
    };
    let port =
        u16::try_from(port).map_err(|_| invalid(format!("port {} is out of range", port)))?;

    let ip = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_matches(|c| c == '[' || c == ']')
            .parse::<IpAddr>()
            .map_err(|e| invalid(format!("invalid host: {}", e)))?
    };

    Ok(SocketAddr::new(ip, port))
}

fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        field,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ApiDocument, ApiOptions, ListenOptions, OperationDocument};

    fn document(options: ApiOptions, operations: &[&str]) -> ConfigDocument {
        ConfigDocument {
            api_name: "app".into(),
            deployment_name: "main".into(),
            api: Some(ApiDocument {
                options,
                operations: operations
                    .iter()
                    .map(|n| OperationDocument { name: n.to_string() })
                    .collect(),
            }),
        }
    }

    #[test]
    fn test_valid_document() {
        let options = ApiOptions {
            listen: ListenOptions {
                host: "127.0.0.1".into(),
                port: PortValue::Text("9991".into()),
            },
            public_node_url: Some("https://api.example.com".into()),
            server_url: Some("http://localhost:9992".into()),
            logger: None,
        };
        let config = NodeConfig::from_document(document(options, &["Users", "Posts"])).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9991".parse().unwrap());
        assert_eq!(config.public_node_url.as_str(), "https://api.example.com/");
        assert_eq!(config.server_url.unwrap().as_str(), "http://localhost:9992/");
        assert_eq!(config.operations, vec!["Users", "Posts"]);
    }

    #[test]
    fn test_public_url_defaults_to_listen_address() {
        let config = NodeConfig::from_document(document(ApiOptions::default(), &[])).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9991".parse().unwrap());
        assert_eq!(config.public_node_url.as_str(), "http://127.0.0.1:9991/");
    }

    #[test]
    fn test_out_of_range_port_is_rejected_in_both_forms() {
        for port in [
            PortValue::Number(70000),
            PortValue::Number(-1),
            PortValue::Text("70000".into()),
        ] {
            let options = ApiOptions {
                listen: ListenOptions {
                    host: "127.0.0.1".into(),
                    port,
                },
                ..Default::default()
            };
            let errors = NodeConfig::from_document(document(options, &[])).unwrap_err();
            match errors.as_slice() {
                [ValidationError::InvalidListenAddress { reason, .. }] => {
                    assert!(reason.contains("out of range"), "{}", reason)
                }
                other => panic!("expected one listen address error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_api() {
        let doc = ConfigDocument {
            api_name: "app".into(),
            ..Default::default()
        };
        assert_eq!(
            NodeConfig::from_document(doc).unwrap_err(),
            vec![ValidationError::MissingApi]
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let options = ApiOptions {
            listen: ListenOptions {
                host: "not-an-ip".into(),
                port: PortValue::Text("99999".into()),
            },
            public_node_url: Some("ftp://example.com".into()),
            server_url: Some("::not a url".into()),
            logger: None,
        };
        let errors = NodeConfig::from_document(document(options, &["A", "A", " "])).unwrap_err();

        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidListenAddress { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUrl { field: "publicNodeUrl", .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUrl { field: "serverUrl", .. })));
        assert!(errors.contains(&ValidationError::DuplicateOperation("A".into())));
        assert!(errors.contains(&ValidationError::EmptyOperationName));
    }
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use nodectl::config::{config_path, parse_configuration, NodeConfig};
use nodectl::lifecycle::{IdleTracker, RunContext, RuntimeError, ServerRuntime};

/// Configuration artifact listening on an ephemeral local port.
pub const LOCAL_CONFIG: &str = r#"{
    "apiName": "app",
    "deploymentName": "main",
    "api": {
        "options": {
            "listen": {"host": "127.0.0.1", "port": 0},
            "publicNodeUrl": "https://api.example.com",
            "serverUrl": "http://127.0.0.1:9",
            "logger": {"level": "info"}
        },
        "operations": [{"name": "Users"}, {"name": "CreateUser"}]
    }
}"#;

/// Create a project directory whose generated config contains `contents`.
pub fn project_with_config(contents: &[u8]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    dir
}

/// A node configuration bound to an ephemeral local port.
pub fn local_config() -> NodeConfig {
    parse_configuration(LOCAL_CONFIG.as_bytes(), &config_path(Path::new("."))).unwrap()
}

/// Poll `/health` until the node answers.
pub async fn wait_until_serving(addr: SocketAddr) {
    let client = reqwest::Client::new();
    let url = format!("http://{}/health", addr);
    for _ in 0..100 {
        if let Ok(res) = client.get(&url).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("node at {} never became healthy", addr);
}

/// How a [`MockRuntime`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Serve until `shutdown`, then return Ok.
    ServeUntilStopped,
    /// Serve until `shutdown`, then return an error.
    ErrorOnStop,
    /// Fail on its own after the given delay.
    FailAfter(Duration),
    /// Ignore `shutdown` and never return.
    Hang,
}

/// A scripted runtime that honours the idle callback like the real server.
pub struct MockRuntime {
    behavior: Behavior,
    stop: CancellationToken,
    shutdown_calls: Arc<AtomicUsize>,
}

impl MockRuntime {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            stop: CancellationToken::new(),
            shutdown_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `shutdown` invocations, readable after the runtime moved.
    pub fn shutdown_calls(&self) -> Arc<AtomicUsize> {
        self.shutdown_calls.clone()
    }
}

#[async_trait]
impl ServerRuntime for MockRuntime {
    async fn run(&self, ctx: RunContext) -> Result<(), RuntimeError> {
        if let (Some(timeout), Some(on_idle)) = (ctx.options.idle_timeout(), ctx.on_idle.clone()) {
            let tracker = IdleTracker::new(timeout);
            let cancel = ctx.cancel.clone();
            tokio::spawn(async move { tracker.watch(on_idle, cancel).await });
        }

        match self.behavior {
            Behavior::ServeUntilStopped => {
                self.stop.cancelled().await;
                Ok(())
            }
            Behavior::ErrorOnStop => {
                self.stop.cancelled().await;
                Err(RuntimeError::Failed("listener closed".into()))
            }
            Behavior::FailAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(RuntimeError::Failed("crashed".into()))
            }
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn shutdown(&self, _deadline: Duration) -> Result<(), RuntimeError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::Hang {
            std::future::pending::<()>().await;
        }
        self.stop.cancel();
        Ok(())
    }
}

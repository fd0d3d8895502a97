//! Lifecycle orchestration for an API node.
//!
//! Loads the generated configuration of a project, starts the node's HTTP
//! runtime and supervises it until an OS signal or the idle timeout stops
//! it, then turns the outcome into a process exit code.

// Entry points
pub mod cli;
pub mod commands;

// Node configuration
pub mod config;

// Runtime
pub mod health;
pub mod http;
pub mod lifecycle;

// Cross-cutting
pub mod observability;

pub use config::NodeConfig;
pub use http::NodeServer;
pub use lifecycle::{Orchestrator, Outcome, StartupOptions, StopLatch};

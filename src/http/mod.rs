//! HTTP surface of the node.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/activity.rs (idle tracking, request metrics)
//!     → middleware/https_redirect.rs (X-Forwarded-Proto: http → 308)
//!     → handlers (/health, /introspect, fallback)
//! ```
//!
//! # Design Decisions
//! - The listener is bound before the lifecycle starts; bind errors are startup errors
//! - Shutdown stops accepting, then drains open connections up to the grace period

pub mod middleware;
pub mod server;

pub use server::{AppState, NodeServer, HEALTH_PATH, INTROSPECT_PATH};

//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Hooks health check (hooks.rs):
//!     node start with health check enabled
//!     → probe <serverUrl>/health until success or timeout
//!     → serve either way; an unhealthy hooks server is logged
//! ```

pub mod hooks;

pub use hooks::{HealthStatus, HooksHealthCheck};

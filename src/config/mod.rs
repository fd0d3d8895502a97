//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <project>/generated/wundergraph.config.json
//!     → loader.rs (locate, read, reject empty files)
//!     → schema.rs (JSON decode into ConfigDocument)
//!     → validation.rs (construct NodeConfig)
//!     → NodeConfig (validated, immutable)
//!
//! nodectl.toml (optional) + command line flags
//!     → settings.rs (Settings)
//!     → StartupOptions, grace period, logging, metrics
//! ```
//!
//! # Design Decisions
//! - Every failure is a distinct ConfigError variant; no partial config
//! - Config is immutable once loaded
//! - Settings are passed down explicitly, never stored globally

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{config_path, load_configuration, parse_configuration, ConfigError, ProjectDir};
pub use schema::ConfigDocument;
pub use settings::{Settings, SettingsError};
pub use validation::{NodeConfig, ValidationError};

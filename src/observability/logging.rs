//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format by default, pretty format when pretty logging is on
//! - `RUST_LOG` wins over the configured level
//! - Logs go to stderr; stdout is reserved for command output

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a level is configured.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "nodectl=debug,tower_http=debug"
    } else {
        "nodectl=info,tower_http=info"
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(debug: bool, pretty: bool, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or_else(|| default_directive(debug))));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if pretty {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert!(default_directive(true).contains("nodectl=debug"));
        assert!(default_directive(false).contains("nodectl=info"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false, true, Some("nodectl=warn"));
        init(true, false, None);
    }
}

//! Command dispatch.
//!
//! # Data Flow
//! ```text
//! Cli (parsed flags)
//!     → Settings (file + flags)
//!     → logging init
//!     → node::start / node::url
//!     → ExitCode
//! ```

pub mod node;

use std::io;
use std::process::ExitCode;

use crate::cli::{Cli, Command, NodeCommand};
use crate::observability::logging;

pub use node::NodeError;

/// Execute the parsed command line and map the result to an exit code.
pub async fn execute(cli: Cli) -> ExitCode {
    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(cli.debug, cli.pretty_logging, None);
            tracing::error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };

    logging::init(
        settings.logging.debug,
        settings.logging.pretty,
        settings.logging.level.as_deref(),
    );

    let result = match &cli.command {
        Command::Node(NodeCommand::Start(_)) => {
            node::start(&settings).await.map(|outcome| outcome.exit_code())
        }
        Command::Node(NodeCommand::Url) => {
            node::url(&settings, &mut io::stdout().lock()).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

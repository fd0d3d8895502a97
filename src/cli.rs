//! Command line interface.
//!
//! Flags override values from the optional settings file, which override
//! the built-in defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Settings, SettingsError};

#[derive(Debug, Parser)]
#[command(name = "nodectl")]
#[command(version, about = "Run and inspect an API node", long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Project directory containing `generated/`
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long, global = true)]
    pub debug: bool,

    /// Human readable log output
    #[arg(long, global = true)]
    pub pretty_logging: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the API node
    #[command(subcommand)]
    Node(NodeCommand),
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Start the node in production mode
    Start(StartArgs),
    /// Print the public URL of the node
    Url,
}

#[derive(Debug, Default, Args)]
pub struct StartArgs {
    /// Shut down after this many seconds without requests (0 disables)
    #[arg(long, visible_alias = "shutdown-after-idle", value_name = "SECS")]
    pub idle_shutdown_seconds: Option<u64>,

    /// Do not redirect plain HTTP requests to HTTPS
    #[arg(long)]
    pub disable_force_https_redirects: bool,

    /// Serve the introspection endpoint
    #[arg(long)]
    pub enable_introspection: bool,

    /// Wait for the hooks server to become healthy before serving
    #[arg(long)]
    pub hooks_health_check: bool,

    /// Hooks server health check timeout [default: 10]
    #[arg(long, value_name = "SECS")]
    pub healthcheck_timeout: Option<u64>,

    /// Time allowed for in-flight requests after a stop [default: 10]
    #[arg(long, value_name = "SECS")]
    pub graceful_timeout: Option<u64>,
}

impl Cli {
    /// Resolve the effective settings for this invocation.
    pub fn settings(&self) -> Result<Settings, SettingsError> {
        let mut settings = match self.settings.as_deref() {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        Ok(settings)
    }

    /// Override `settings` with the flags given on the command line.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.project_dir {
            settings.project_dir = dir.clone();
        }
        if self.debug {
            settings.logging.debug = true;
        }
        if self.pretty_logging {
            settings.logging.pretty = true;
        }

        if let Command::Node(NodeCommand::Start(args)) = &self.command {
            args.apply(settings);
        }
    }
}

impl StartArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(secs) = self.idle_shutdown_seconds {
            settings.shutdown.idle_shutdown_secs = secs;
        }
        if let Some(secs) = self.graceful_timeout {
            settings.shutdown.graceful_timeout_secs = secs;
        }
        if self.disable_force_https_redirects {
            settings.http.force_https_redirects = false;
        }
        if self.enable_introspection {
            settings.http.introspection = true;
        }
        if self.hooks_health_check {
            settings.health_check.enabled = true;
        }
        if let Some(secs) = self.healthcheck_timeout {
            settings.health_check.timeout_secs = secs;
        }
    }
}

//! nodectl
//!
//! ```text
//!   SIGINT / SIGTERM ──┐
//!                      ▼
//!   ┌──────────┐   ┌───────────┐   ┌──────────────────────────────┐
//!   │  config  │──▶│ lifecycle │──▶│ http (NodeServer)            │
//!   │ loader   │   │orchestrat.│   │  /health  /introspect        │
//!   └──────────┘   └─────┬─────┘   │  activity → idle tracker ────┼──┐
//!                        │         └──────────────────────────────┘  │
//!                        ▼                                            │
//!                   exit code  ◀──────── stop latch ◀─────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use nodectl::cli::Cli;
use nodectl::commands;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    commands::execute(cli).await
}

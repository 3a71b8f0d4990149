//! CLI help: command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string used in log events (e.g. "run", "jobs").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::Status { .. } => "status",
        Commands::Jobs { .. } => "jobs",
        Commands::Check { .. } => "check",
        Commands::Workflow => "workflow",
    }
}

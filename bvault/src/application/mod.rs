pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use bvault_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync { config, retry } => handlers::handle_sync(config, retry),
        Commands::Status { config, reconcile } => handlers::handle_status(config, reconcile),
    }
}

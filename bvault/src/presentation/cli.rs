use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "bvault: incremental build archive mirror", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover new builds and fetch their expected files
    Sync {
        /// JSON run configuration
        #[arg(long, short)]
        config: PathBuf,
        /// Also attempt to download files recorded as missing
        #[arg(long)]
        retry: bool,
    },

    /// Compare the missing ledger with the files on disk
    Status {
        #[arg(long, short)]
        config: PathBuf,
        /// Rewrite the ledger so it matches disk, then save it
        #[arg(long)]
        reconcile: bool,
    },
}

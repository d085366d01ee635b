//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Migrate a source instance's data into a local target database
#[derive(Parser, Debug)]
#[command(name = "dataport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); `dataport.yaml` is used when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Subcommand to run; migration when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Migrate)
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Extract from the source, snapshot, filter and load into the target
    Migrate,

    /// Start the import HTTP service
    Serve {
        /// Port to listen on (defaults to `server.port` from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - biblion init --config <path>
//! - biblion serve --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// biblion - a small, self-hostable library lending service
#[derive(Parser, Debug)]
#[command(name = "biblion")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter configuration file and create the data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./biblion.json")]
        config: PathBuf,
    },

    /// Start the lending service
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./biblion.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

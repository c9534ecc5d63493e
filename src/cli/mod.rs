//! Command-line interface definitions.

pub(crate) mod plan;
pub(crate) mod serve;
pub(crate) mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// OINTment usage and marketplace service.
#[derive(Parser, Debug)]
#[command(name = "ointment", version, about)]
pub(crate) struct Cli {
    /// Path to a TOML config file (default: ./ointment.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind address
        #[arg(long)]
        bind: Option<String>,
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the marketplace purchase token for a user
    Token {
        /// User id the token is issued for
        user_id: String,
    },
    /// Print the plan definition as JSON
    Plan,
}

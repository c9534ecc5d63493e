//! OINTment CLI entry point.

mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use ointment::config::{Config, LogFormat};

use cli::{Cli, Commands};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Load the config while `subscriber` is the active dispatcher. The log
/// format is only known afterwards, so override warnings would otherwise be
/// dropped.
fn load_config<S, F>(subscriber: S, path: Option<&Path>, lookup: F) -> ointment::Result<Config>
where
    S: Subscriber + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    tracing::subscriber::with_default(subscriber, || Config::load_with(path, lookup))
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is the normal case in production.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let bootstrap = tracing_subscriber::fmt().with_env_filter(env_filter()).finish();
    let config = load_config(bootstrap, cli.config.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    init_tracing(config.log_format);

    match cli.command {
        Commands::Serve { bind, port } => cli::serve::cmd_serve(config, bind, port).await,
        Commands::Token { user_id } => cli::token::cmd_token(&config, &user_id),
        Commands::Plan => cli::plan::cmd_plan(&config),
    }
}

//! `ointment serve` command.

use anyhow::{Context, Result};

use ointment::api::{start_server, AppState};
use ointment::config::Config;
use ointment::usage::store;

/// Select the usage store, wire services and run the API server.
pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = store::from_config(&config.database)
        .await
        .context("Failed to initialise usage store")?;
    if config.marketplace.shared_secret.is_none() {
        tracing::warn!(
            "MARKETPLACE_SHARED_SECRET is not set; marketplace activation will be refused"
        );
    }

    let state = AppState::new(&config, store);
    start_server(&config, state)
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {e}"))
}

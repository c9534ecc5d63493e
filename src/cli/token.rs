//! `ointment token` command.

use anyhow::Result;

use ointment::config::Config;
use ointment::error::OintmentError;
use ointment::marketplace::purchase_token;

/// Print the purchase token accepted by `POST /marketplace-activate`.
pub(crate) fn cmd_token(config: &Config, user_id: &str) -> Result<()> {
    println!("{}", issue(config, user_id)?);
    Ok(())
}

fn issue(config: &Config, user_id: &str) -> Result<String, OintmentError> {
    let secret = config
        .marketplace
        .shared_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            OintmentError::ConfigurationMissing(
                "MARKETPLACE_SHARED_SECRET is not configured".to_string(),
            )
        })?;
    if user_id.is_empty() {
        return Err(OintmentError::InvalidRequest("user id is required".to_string()));
    }
    Ok(purchase_token(secret, user_id))
}

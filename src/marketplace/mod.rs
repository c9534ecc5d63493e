//! Marketplace plan activation.
//!
//! Two proof schemes activate a plan:
//!
//! 1. [`Marketplace::activate`]: the client submits `HMAC-SHA256(secret,
//!    user_id)`. This path always records the static marketplace plan id.
//! 2. [`Marketplace::handle_webhook`]: the marketplace posts a signed
//!    purchase event. This path records the plan named in the event and
//!    marks the snapshot paid only for [`webhook::PAID_ACTIONS`].
//!
//! Both paths are live at the same time. Integrators should note that they
//! can disagree on the recorded `planId` for the same account.

pub mod signature;
pub mod webhook;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{OintmentError, Result};
use crate::usage::{Plan, UsageService, UsageSnapshot};

pub use signature::{purchase_token, verify_purchase_token, verify_webhook_signature};
pub use webhook::MarketplaceEvent;

/// Outcome of a processed webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub action: String,
    pub user_id: String,
    pub usage: UsageSnapshot,
}

/// Verifies purchase proofs and flips plan status on usage snapshots.
#[derive(Clone)]
pub struct Marketplace {
    usage: Arc<UsageService>,
    shared_secret: Option<String>,
}

impl Marketplace {
    /// `shared_secret` of `None` (or empty) makes every activation fail with
    /// [`OintmentError::ConfigurationMissing`].
    pub fn new(usage: Arc<UsageService>, shared_secret: Option<String>) -> Self {
        Self {
            usage,
            shared_secret: shared_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn plan(&self) -> &Plan {
        self.usage.plan()
    }

    fn secret(&self) -> Result<&str> {
        self.shared_secret.as_deref().ok_or_else(|| {
            OintmentError::ConfigurationMissing(
                "MARKETPLACE_SHARED_SECRET is not configured".to_string(),
            )
        })
    }

    /// Activate the marketplace plan for `user_id` using a purchase token.
    #[instrument(skip(self, token))]
    pub async fn activate(&self, user_id: &str, token: &str) -> Result<UsageSnapshot> {
        let secret = self.secret()?;
        if let Err(err) = verify_purchase_token(secret, user_id, token) {
            warn!("Purchase token rejected");
            return Err(err);
        }

        let plan_id = self.usage.plan().id.clone();
        let snapshot = self.usage.set_plan(user_id, &plan_id, true).await?;
        info!(plan_id = %plan_id, "Marketplace plan activated");
        Ok(snapshot)
    }

    /// Verify, decode and apply a webhook delivery.
    ///
    /// `body` must be the exact bytes received; the signature is checked
    /// before any decoding.
    #[instrument(skip_all)]
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<WebhookOutcome> {
        let secret = self.secret()?;
        if let Err(err) = verify_webhook_signature(secret, body, signature) {
            warn!(
                body_len = body.len(),
                has_signature = signature.is_some(),
                "Webhook signature rejected"
            );
            return Err(err);
        }

        let event = MarketplaceEvent::parse(body, content_type)?;
        let user_id = event.derived_user_id()?;
        let plan_id = event.plan_id(&self.usage.plan().id);
        let is_paid = event.is_paid();

        let usage = self.usage.set_plan(&user_id, &plan_id, is_paid).await?;
        info!(
            action = %event.action,
            user_id = %user_id,
            plan_id = %plan_id,
            is_paid,
            "Marketplace webhook applied"
        );

        Ok(WebhookOutcome {
            action: event.action,
            user_id,
            usage,
        })
    }
}

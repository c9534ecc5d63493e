//! Marketplace webhook events.
//!
//! Bodies arrive either as raw JSON or form-encoded with the JSON document
//! in a `payload` field. Decoding only happens after the signature over the
//! raw bytes has been verified.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{OintmentError, Result};

/// Event actions that leave the purchase in a paid state.
pub const PAID_ACTIONS: &[&str] = &["purchased", "pending_change", "changed", "renewed"];

/// A `marketplace_purchase` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceEvent {
    pub action: String,
    #[serde(default)]
    pub marketplace_purchase: Option<MarketplacePurchase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplacePurchase {
    #[serde(default)]
    pub account: Option<MarketplaceAccount>,
    #[serde(default)]
    pub plan: Option<MarketplacePlan>,
}

/// Purchasing account. `id` may be numeric or a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplaceAccount {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplacePlan {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl MarketplaceEvent {
    /// Decode a verified body according to its `Content-Type`.
    pub fn parse(body: &[u8], content_type: Option<&str>) -> Result<Self> {
        let is_form = content_type
            .map(|ct| ct.trim().to_ascii_lowercase())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let payload = url::form_urlencoded::parse(body)
                .find(|(key, _)| key == "payload")
                .map(|(_, value)| value.into_owned())
                .ok_or_else(|| {
                    OintmentError::InvalidPayload("form body has no payload field".to_string())
                })?;
            serde_json::from_str(&payload)
                .map_err(|e| OintmentError::InvalidPayload(e.to_string()))
        } else {
            serde_json::from_slice(body).map_err(|e| OintmentError::InvalidPayload(e.to_string()))
        }
    }

    /// Whether this action leaves the account on a paid plan.
    pub fn is_paid(&self) -> bool {
        PAID_ACTIONS.contains(&self.action.as_str())
    }

    /// Stable user id for the purchasing account: `marketplace-<id-or-login>`.
    pub fn derived_user_id(&self) -> Result<String> {
        let account = self
            .marketplace_purchase
            .as_ref()
            .and_then(|p| p.account.as_ref());

        let handle = account
            .and_then(|a| a.id.as_ref())
            .and_then(value_to_key)
            .or_else(|| {
                account
                    .and_then(|a| a.login.as_deref())
                    .map(str::trim)
                    .filter(|login| !login.is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                OintmentError::InvalidRequest(
                    "marketplace event is missing an account id or login".to_string(),
                )
            })?;

        Ok(format!("marketplace-{handle}"))
    }

    /// Plan id recorded on the snapshot: the plan name, else its id, else
    /// `fallback`.
    pub fn plan_id(&self, fallback: &str) -> String {
        let plan = self
            .marketplace_purchase
            .as_ref()
            .and_then(|p| p.plan.as_ref());
        plan.and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| plan.and_then(|p| p.id.as_ref()).and_then(value_to_key))
            .unwrap_or_else(|| fallback.to_string())
    }
}

fn value_to_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

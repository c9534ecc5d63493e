//! Marketplace activation routes.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::routes::usage::required;
use crate::api::server::AppState;
use crate::error::{OintmentError, Result};
use crate::marketplace::signature::SIGNATURE_HEADER;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub user_id: Option<String>,
    pub purchase_token: Option<String>,
}

/// POST /marketplace-activate: activate the plan with a purchase token.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ActivateRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = payload.map_err(|e| OintmentError::InvalidRequest(e.body_text()))?;

    let (Some(user_id), Some(token)) = (
        required(body.user_id.as_deref()),
        required(body.purchase_token.as_deref()),
    ) else {
        return Err(OintmentError::InvalidRequest(
            "userId and purchaseToken are required".to_string(),
        ));
    };

    let usage = state.marketplace.activate(user_id, token).await?;
    Ok(Json(json!({
        "plan": state.marketplace.plan(),
        "usage": usage,
        "status": "activated",
    })))
}

/// POST /marketplace-webhook: apply a signed marketplace purchase event.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .marketplace
        .handle_webhook(&body, signature, content_type)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "action": outcome.action,
        "plan": state.marketplace.plan(),
        "usage": outcome.usage,
    })))
}

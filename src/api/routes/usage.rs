//! Usage overview and metering routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::server::AppState;
use crate::error::{OintmentError, Result};
use crate::usage::summarize_core_runs;

#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Body of `POST /usage`. Fields are optional so missing ones produce a
/// 400 with a readable message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRequest {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub core_id: Option<String>,
}

/// Non-empty value of an optional string field. Ids are opaque, so
/// surrounding whitespace is kept.
pub(crate) fn required(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// GET /usage-overview?userId=<id>: plan definition plus current snapshot.
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<Value>> {
    let user_id = required(query.user_id.as_deref()).unwrap_or(&state.demo_user_id);
    let usage = state.usage.snapshot(user_id).await?;
    let summary = summarize_core_runs(&usage.core_runs);
    Ok(Json(json!({
        "plan": state.usage.plan(),
        "usage": usage,
        "summary": summary,
    })))
}

/// POST /usage: validate and record one metered action.
pub async fn post_usage(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UsageRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = payload.map_err(|e| OintmentError::InvalidRequest(e.body_text()))?;

    let (Some(user_id), Some(action)) = (
        required(body.user_id.as_deref()),
        required(body.action.as_deref()),
    ) else {
        return Err(OintmentError::InvalidRequest(
            "userId and action are required".to_string(),
        ));
    };

    let usage = state
        .usage
        .record(user_id, action, body.core_id.as_deref())
        .await?;
    Ok(Json(json!({ "usage": usage })))
}

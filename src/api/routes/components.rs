//! Integration matrix route.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;

use crate::error::{OintmentError, Result};
use crate::integration::{component_rows, ComponentRow};

#[derive(Debug, Default, Deserialize)]
pub struct ComponentsQuery {
    pub deps: Option<String>,
}

/// GET /components?deps=a,b,c: scored rows for the listed dependencies.
pub async fn list_components(Query(query): Query<ComponentsQuery>) -> Result<Json<Vec<ComponentRow>>> {
    let deps = query
        .deps
        .ok_or_else(|| OintmentError::InvalidRequest("deps is required".to_string()))?;
    Ok(Json(component_rows(&deps)))
}

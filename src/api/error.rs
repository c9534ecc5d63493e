//! HTTP mapping for [`OintmentError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::error::OintmentError;

impl OintmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OintmentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OintmentError::InvalidAction(_) | OintmentError::LimitExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            OintmentError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            OintmentError::ConfigurationMissing(_)
            | OintmentError::StoreUnavailable(_)
            | OintmentError::InvalidPayload(_)
            | OintmentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body. Limit failures carry the action and counter context.
    pub fn body(&self) -> Value {
        match self {
            OintmentError::LimitExceeded {
                action,
                current,
                limit,
                message,
            } => json!({
                "error": message,
                "action": action,
                "current": current,
                "limit": limit,
            }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for OintmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (OintmentError::InvalidRequest("x".into()), 400),
            (OintmentError::InvalidAction("x".into()), 429),
            (
                OintmentError::LimitExceeded {
                    action: "start-session".into(),
                    current: 4,
                    limit: 4,
                    message: "x".into(),
                },
                429,
            ),
            (OintmentError::AuthenticationFailed("x".into()), 401),
            (OintmentError::ConfigurationMissing("x".into()), 500),
            (OintmentError::StoreUnavailable("x".into()), 500),
            (OintmentError::InvalidPayload("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code, "{err:?}");
        }
    }

    #[test]
    fn test_limit_body_has_context() {
        let err = OintmentError::LimitExceeded {
            action: "core-run".into(),
            current: 3,
            limit: 3,
            message: "Core roaster already executed 3 runs this cycle.".into(),
        };
        let body = err.body();
        assert_eq!(body["action"], "core-run");
        assert_eq!(body["current"], 3);
        assert_eq!(body["limit"], 3);
        assert_eq!(
            body["error"],
            "Core roaster already executed 3 runs this cycle."
        );
    }

    #[test]
    fn test_into_response_status() {
        let resp = OintmentError::AuthenticationFailed("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

//! Axum API server for OINTment usage and marketplace endpoints.

use crate::config::{Config, ServerConfig};
use crate::marketplace::Marketplace;
use crate::usage::{MemorySnapshotStore, Plan, SnapshotStore, UsageService};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Usage metering over the configured snapshot store.
    pub usage: Arc<UsageService>,
    /// Purchase-proof verification and plan activation.
    pub marketplace: Arc<Marketplace>,
    /// User reported by `GET /usage-overview` when the query omits `userId`.
    pub demo_user_id: String,
}

impl AppState {
    /// Wire services over an already-selected snapshot store.
    pub fn new(config: &Config, store: Arc<dyn SnapshotStore>) -> Self {
        let plan = Plan::marketplace(config.plan.limits());
        let usage = Arc::new(UsageService::new(store, plan));
        let marketplace = Arc::new(Marketplace::new(
            Arc::clone(&usage),
            config.marketplace.shared_secret.clone(),
        ));
        Self {
            usage,
            marketplace,
            demo_user_id: config.marketplace.demo_user_id.clone(),
        }
    }

    /// State over a fresh in-process store.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(config, Arc::new(MemorySnapshotStore::new()))
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let shared_state = Arc::new(state);

    let router = Router::new()
        .route("/health", get(super::routes::health::get_health))
        // Usage
        .route("/usage-overview", get(super::routes::usage::get_overview))
        .route("/usage", post(super::routes::usage::post_usage))
        // Marketplace
        .route(
            "/marketplace-activate",
            post(super::routes::marketplace::activate),
        )
        .route(
            "/marketplace-webhook",
            post(super::routes::marketplace::webhook),
        )
        // Integration matrix
        .route(
            "/components",
            get(super::routes::components::list_components),
        )
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    match cors_layer(server) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the dashboard frontend, if an origin is configured and valid.
fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    let origin = server.cors_origin.as_deref()?;
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([HeaderName::from_static("content-type")]),
    )
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(
    config: &Config,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state, &config.server);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("OINTment API server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{purchase_token, signature::webhook_signature};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const SECRET: &str = "router-secret";

    fn router() -> Router {
        let mut config = Config::default();
        config.marketplace.shared_secret = Some(SECRET.into());
        build_router(AppState::in_memory(&config), &config.server)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_state_wires_plan_overrides() {
        let mut config = Config::default();
        config.plan.max_sessions = Some(1);
        let state = AppState::in_memory(&config);
        assert_eq!(state.usage.plan().limits.max_sessions, 1);
        assert_eq!(state.demo_user_id, "demo-user");
    }

    #[test]
    fn test_cors_layer_only_with_valid_origin() {
        let mut server = ServerConfig::default();
        assert!(cors_layer(&server).is_none());
        server.cors_origin = Some("http://localhost:3001".into());
        assert!(cors_layer(&server).is_some());
        server.cors_origin = Some("bad\norigin".into());
        assert!(cors_layer(&server).is_none());
    }

    #[tokio::test]
    async fn test_health_route() {
        let resp = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_usage_route_status_codes() {
        let app = router();

        let resp = app
            .clone()
            .oneshot(post_json("/usage", json!({ "userId": "alice" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/usage",
                json!({ "userId": "alice", "action": "teleport" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/usage",
                json!({ "userId": "alice", "action": "core-run" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = app
            .oneshot(post_json(
                "/usage",
                json!({ "userId": "alice", "action": "project-submission" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["usage"]["projectSubmissions"], 1);
    }

    #[tokio::test]
    async fn test_usage_route_malformed_json_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/usage")
            .header("content-type", "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_core_run_limit_over_http() {
        let app = router();
        for _ in 0..3 {
            let resp = app
                .clone()
                .oneshot(post_json(
                    "/usage",
                    json!({ "userId": "bob", "action": "core-run", "coreId": "roaster" }),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = app
            .clone()
            .oneshot(post_json(
                "/usage",
                json!({ "userId": "bob", "action": "core-run", "coreId": "roaster" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(resp).await;
        assert_eq!(body["action"], "core-run");
        assert_eq!(body["limit"], 3);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/usage-overview?userId=bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["usage"]["coreRuns"]["roaster"], 3);
    }

    #[tokio::test]
    async fn test_activation_over_http() {
        let app = router();
        let resp = app
            .clone()
            .oneshot(post_json(
                "/marketplace-activate",
                json!({ "userId": "carol", "purchaseToken": "bogus" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(resp).await;
        assert!(!body["error"].as_str().unwrap().contains(SECRET));

        let token = purchase_token(SECRET, "carol");
        let resp = app
            .oneshot(post_json(
                "/marketplace-activate",
                json!({ "userId": "carol", "purchaseToken": token }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "activated");
    }

    #[tokio::test]
    async fn test_webhook_over_http() {
        let app = router();
        let raw = json!({
            "action": "purchased",
            "marketplace_purchase": {
                "account": { "login": "alice" },
                "plan": { "name": "pro" }
            }
        })
        .to_string();

        let bad = Request::builder()
            .method("POST")
            .uri("/marketplace-webhook")
            .header("content-type", "application/json")
            .header("x-hub-signature-256", "sha256=00")
            .body(Body::from(raw.clone()))
            .unwrap();
        let resp = app.clone().oneshot(bad).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let good = Request::builder()
            .method("POST")
            .uri("/marketplace-webhook")
            .header("content-type", "application/json")
            .header("x-hub-signature-256", webhook_signature(SECRET, raw.as_bytes()))
            .body(Body::from(raw))
            .unwrap();
        let resp = app.oneshot(good).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["usage"]["userId"], "marketplace-alice");
        assert_eq!(body["usage"]["isPaid"], true);
        assert_eq!(body["usage"]["planId"], "pro");
    }

    #[tokio::test]
    async fn test_webhook_without_secret_is_server_error() {
        let config = Config::default();
        let app = build_router(AppState::in_memory(&config), &config.server);
        let req = Request::builder()
            .method("POST")
            .uri("/marketplace-webhook")
            .header("x-hub-signature-256", "sha256=00")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

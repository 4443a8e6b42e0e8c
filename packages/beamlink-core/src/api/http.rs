//! HTTP route handlers.
//!
//! All handlers are thin - they hand named commands to the dispatcher.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_error, api_success};
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::command::CastCommand;
use crate::error::{CastError, CastResult};
use crate::protocol_constants::{APP_NAME, SERVICE_ID};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/session", get(get_session))
        .route("/api/commands/{name}", post(run_command))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe.
async fn health_check() -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "app": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_session(State(state): State<AppState>) -> CastResult<impl IntoResponse> {
    let reply = state.dispatcher.execute(CastCommand::GetSessionState).await?;
    Ok(api_success(json!({ "result": reply })))
}

/// Runs one named command. The body is the argument map; an empty body
/// means "no arguments".
async fn run_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> CastResult<impl IntoResponse> {
    let args = parse_args(&body)?;
    let reply = state.dispatcher.dispatch(&name, &args).await?;
    Ok(api_success(json!({ "result": reply })))
}

async fn not_found() -> impl IntoResponse {
    api_error(StatusCode::NOT_FOUND, "not_found", "no such route")
}

fn parse_args(body: &[u8]) -> CastResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| CastError::InvalidArgument(format!("request body is not valid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::backend::SimulatedBackend;
    use crate::bootstrap::bootstrap_services;
    use crate::config::CastConfig;

    fn test_router() -> Router {
        let backend = Arc::new(SimulatedBackend::new().with_device("abc", "Living Room TV"));
        let services = bootstrap_services(&CastConfig::default(), backend.clone(), backend)
            .expect("bootstrap");
        create_router(AppState::from_services(&services))
    }

    async fn post_command(router: Router, name: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::post(format!("/api/commands/{}", name))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn blank_body_means_no_arguments() {
        assert_eq!(parse_args(b"").unwrap(), Value::Null);
        assert_eq!(parse_args(b"  \n").unwrap(), Value::Null);
        assert_eq!(parse_args(br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert!(parse_args(b"{nope").is_err());
    }

    #[tokio::test]
    async fn is_supported_returns_result_envelope() {
        let (status, body) = post_command(test_router(), "isSupported", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": true }));
    }

    #[tokio::test]
    async fn unknown_command_maps_to_not_implemented() {
        let (status, body) = post_command(test_router(), "showCastDialog", "{}").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["error"], "not_implemented");
    }

    #[tokio::test]
    async fn invalid_arguments_map_to_bad_request() {
        let (status, body) =
            post_command(test_router(), "shareVideo", r#"{"videoUrl":""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");

        let (status, _) = post_command(test_router(), "shareVideo", "{oops").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_endpoint_reports_idle() {
        let request = Request::get("/api/session").body(Body::empty()).unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["result"]["state"], "idle");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let request = Request::get("/nope").body(Body::empty()).unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

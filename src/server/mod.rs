//! HTTP surface of the offline shell.
//!
//! Browsers load the attendance app through this server. Every request is
//! answered by the [`OfflineCache`]; control messages arrive on
//! `POST /__shell/message`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth;
use crate::client::MSG_ENDPOINT_MISSING;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::ControlMessage;
use crate::shell::{FetchRequest, OfflineCache};

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<OfflineCache>,
    pub config: Arc<Config>,
}

/// Create the shell router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.control_psk.clone();

    let control_routes = Router::new()
        .route("/__shell/message", post(post_message))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    Router::new()
        .route("/health", get(health_check))
        .route("/exec", post(proxy_service))
        .merge(control_routes)
        .fallback(proxy_static)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// POST /__shell/message - queue a control message. Replies before it runs.
async fn post_message(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, AppError> {
    let message: ControlMessage = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Unknown control message: {}", e)))?;

    info!(?message, "Received control message");
    tokio::spawn(async move {
        state.cache.handle_message(message).await;
    });

    Ok(StatusCode::ACCEPTED)
}

/// POST /exec - attendance service call, forwarded network-only.
async fn proxy_service(State(state): State<AppState>, request: Request) -> Response {
    let Some(endpoint) = state.config.configured_api_url() else {
        return AppError::Config(MSG_ENDPOINT_MISSING.to_string()).into_response();
    };
    let query = request
        .uri()
        .query()
        .map(|q| format!("?{}", q))
        .unwrap_or_default();
    let url = format!("{}{}", endpoint, query);

    forward(&state, request, url).await
}

/// Everything else - a static asset under the configured origin.
async fn proxy_static(State(state): State<AppState>, request: Request) -> Response {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let url = state.cache.resolve(&path);

    forward(&state, request, url).await
}

async fn forward(state: &AppState, request: Request, url: String) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return AppError::BadRequest(format!("Failed to read request body: {}", e))
                .into_response()
        }
    };

    let fetch = FetchRequest {
        method: parts.method,
        url,
        headers: parts.headers,
        body,
    };

    state.cache.respond(fetch).await.into_response()
}

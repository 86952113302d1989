//! HTTP API module - REST endpoints

mod auth;
mod images;
mod proxy;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::auth::{LoginClient, SessionKeys};
use crate::commerce::CommerceBackend;
use crate::Config;

pub use auth::{removal_cookie, session_cookie, OrdersResponse};
pub use images::{UpdateImageResponse, UPDATE_IMAGE_PATH};
pub use proxy::PROXY_IMAGE_PATH;

/// Room for multipart framing and the slug field on top of the image itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub commerce: Arc<dyn CommerceBackend>,
    pub sessions: Arc<SessionKeys>,
    pub login: Arc<LoginClient>,
    /// Client for proxied upstream fetches
    pub http: reqwest::Client,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(proxy::router())
        .merge(images::router().layer(DefaultBodyLimit::max(body_limit)))
        .merge(auth::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "storefront",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

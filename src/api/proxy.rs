//! Image proxy endpoint
//!
//! GET /api/proxy-image?url=... - Re-serve an image from the trusted file
//! host with permissive CORS, so the in-browser editor can load it.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::AppState;
use crate::error::ApiError;
use crate::images::same_origin;

pub const PROXY_IMAGE_PATH: &str = "/api/proxy-image";

const CACHE_DIRECTIVE: &str = "public, max-age=3600";

/// Upstream headers passed through unchanged
const FORWARDED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ETAG,
    header::LAST_MODIFIED,
];

/// Build the proxy router
pub fn router() -> Router<AppState> {
    Router::new().route(PROXY_IMAGE_PATH, get(proxy_image))
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

async fn proxy_image(
    State(state): State<AppState>,
    Query(params): Query<ProxyQuery>,
) -> Result<Response, ApiError> {
    let url = params
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing url param".to_string()))?;

    if !same_origin(&url, &state.config.trusted_file_host) {
        warn!("Refusing to proxy untrusted URL: {}", url);
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }

    debug!("Proxying image from {}", url);
    let upstream = match state.http.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Proxy fetch failed for {}: {}", url, e);
            return Ok(StatusCode::BAD_GATEWAY.into_response());
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        debug!("Upstream returned {} for {}", status, url);
        return Ok(status.into_response());
    }

    let mut builder = Response::builder().status(status);
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(name, value.clone());
        }
    }
    let response = builder
        .header(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )
        .header(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_DIRECTIVE))
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::internal(format!("failed to build proxy response: {}", e)))?;

    Ok(response)
}

//! Session endpoints and the session-checking middleware

use axum::{
    extract::{rejection::FormRejection, Form, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AppState;
use crate::auth::{LoginError, SessionClaims, SESSION_COOKIE};
use crate::error::ApiError;

const LOGIN_PAGE: &str = "/login";
const AFTER_LOGIN: &str = "/orders";

/// Build auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/orders", get(orders))
}

/// Build the `session` cookie for a signed token
pub fn session_cookie(token: String, claims: &SessionClaims, secure: bool) -> Cookie<'static> {
    let expires = time::OffsetDateTime::from_unix_timestamp(claims.exp)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);

    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .expires(expires)
        .build()
}

/// Cookie that clears the session
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Log in against the external API and start a signed session
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginRequest>, FormRejection>,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.verify(cookie.value()).is_ok() {
            debug!("Session already present, skipping login");
            return Ok((jar, Redirect::to(AFTER_LOGIN)));
        }
    }

    let Form(req) = form.map_err(|e| ApiError::Validation(e.body_text()))?;

    let upstream_token = state
        .login
        .authenticate(&req.username, &req.password)
        .await
        .map_err(|e| match e {
            LoginError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            LoginError::Http(e) => {
                warn!("Auth API unreachable: {}", e);
                ApiError::Upstream {
                    status: axum::http::StatusCode::BAD_GATEWAY,
                    message: "Authentication service unavailable".to_string(),
                }
            }
        })?;

    let claims = state.sessions.claims_for(&req.username, upstream_token);
    let token = state.sessions.issue(&claims)?;
    info!("Session started for '{}'", req.username);

    let jar = jar.add(session_cookie(token, &claims, state.config.secure_cookies));
    Ok((jar, Redirect::to(AFTER_LOGIN)))
}

/// Drop the session cookie
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(removal_cookie()), Redirect::to(LOGIN_PAGE))
}

/// Session summary for the signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub user: String,
    pub expires: i64,
}

/// Protected landing page. Order listing itself lives elsewhere.
async fn orders(request: Request) -> Result<Json<OrdersResponse>, ApiError> {
    let claims = request
        .extensions()
        .get::<SessionClaims>()
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;

    Ok(Json(OrdersResponse {
        user: claims.user.username.clone(),
        expires: claims.expires,
    }))
}

/// Verify the session on protected paths.
///
/// Missing, forged or expired sessions redirect to the login page. Sessions
/// close to expiry are re-issued on the way out.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let protected = state
        .config
        .protected_paths
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()));
    if !protected {
        return next.run(request).await;
    }

    let claims = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.sessions.verify(cookie.value()) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejecting session on {}: {}", path, e);
                return (jar.remove(removal_cookie()), Redirect::to(LOGIN_PAGE)).into_response();
            }
        },
        None => return Redirect::to(LOGIN_PAGE).into_response(),
    };

    let renewed = state
        .sessions
        .renew(&claims, chrono::Utc::now().timestamp_millis());
    let current = renewed.clone().unwrap_or(claims);
    request.extensions_mut().insert(current);

    let response = next.run(request).await;

    match renewed {
        Some(claims) => match state.sessions.issue(&claims) {
            Ok(token) => {
                debug!("Renewed session for '{}'", claims.user.username);
                let cookie = session_cookie(token, &claims, state.config.secure_cookies);
                (jar.add(cookie), response).into_response()
            }
            Err(e) => {
                warn!("Failed to renew session: {}", e);
                response
            }
        },
        None => response,
    }
}

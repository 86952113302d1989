//! Session tokens
//!
//! A session is an HS256-signed token carried in the `session` cookie. It
//! wraps the opaque token issued by the external login API, so the routing
//! layer can verify every session itself instead of trusting cookie presence.

pub mod login;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use login::{LoginClient, LoginError};

/// Cookie name holding the session token
pub const SESSION_COOKIE: &str = "session";

/// Sessions closer than this to expiry are re-issued (milliseconds)
pub const RENEWAL_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session expired")]
    Expired,

    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
}

/// Signed session payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    /// Token issued by the external login API
    pub upstream_token: String,
    /// Expiry in unix milliseconds
    pub expires: i64,
    pub iat: i64,
    /// Expiry in unix seconds, checked by the token library
    pub exp: i64,
}

impl SessionClaims {
    fn new(user: SessionUser, upstream_token: String, now_ms: i64, duration: Duration) -> Self {
        let expires = now_ms + duration.num_milliseconds();
        Self {
            user,
            upstream_token,
            expires,
            iat: now_ms / 1000,
            exp: expires / 1000,
        }
    }
}

/// Signs and verifies session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    duration: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, duration: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Claims for a fresh session starting now
    pub fn claims_for(&self, username: &str, upstream_token: String) -> SessionClaims {
        SessionClaims::new(
            SessionUser {
                username: username.to_string(),
            },
            upstream_token,
            Utc::now().timestamp_millis(),
            self.duration,
        )
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(e),
            })?
            .claims;

        if claims.expires < Utc::now().timestamp_millis() {
            return Err(SessionError::Expired);
        }
        Ok(claims)
    }

    /// Extend a session that is about to expire by a full duration.
    ///
    /// Returns `None` while the session still has more than the renewal
    /// window left.
    pub fn renew(&self, claims: &SessionClaims, now_ms: i64) -> Option<SessionClaims> {
        if claims.expires - now_ms >= RENEWAL_WINDOW_MS {
            return None;
        }
        Some(SessionClaims::new(
            claims.user.clone(),
            claims.upstream_token.clone(),
            now_ms,
            self.duration,
        ))
    }
}

//! External login API client
//!
//! Exchanges a username and password for an opaque bearer token.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Login errors
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("auth API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Client for the external login endpoint
#[derive(Debug, Clone)]
pub struct LoginClient {
    client: Client,
    url: String,
}

impl LoginClient {
    pub fn new(url: impl Into<String>) -> Result<Self, LoginError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            url: url.into(),
        })
    }

    /// Returns the upstream token on success
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, LoginError> {
        debug!("Authenticating '{}' against {}", username, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&Credentials { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Login rejected for '{}': {}", username, response.status());
            return Err(LoginError::InvalidCredentials);
        }

        let body: TokenResponse = response.json().await.unwrap_or_default();
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(LoginError::InvalidCredentials)
    }
}

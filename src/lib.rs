//! storefront - storefront server
//!
//! Serves the product image proxy, the image edit-and-publish route backed
//! by a Stripe-style commerce API, and cookie sessions against an external
//! login API. The client half of the publish pipeline lives in [`publish`].

pub mod api;
pub mod auth;
pub mod commerce;
pub mod config;
pub mod error;
pub mod images;
pub mod publish;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use api::AppState;
use auth::{LoginClient, SessionKeys};
use commerce::{CommerceBackend, StripeClient};

pub use config::Config;

/// The storefront server instance
pub struct Server {
    config: Arc<Config>,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server talking to the Stripe API
    pub fn new(config: Config) -> Result<Self> {
        let stripe = StripeClient::from_config(&config)?;
        Self::with_backend(config, Arc::new(stripe))
    }

    /// Create a server with an explicit commerce backend
    pub fn with_backend(config: Config, commerce: Arc<dyn CommerceBackend>) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let sessions = SessionKeys::new(
            &config.session_secret,
            chrono::Duration::seconds(i64::try_from(config.session_duration_secs)?),
        );
        let login = LoginClient::new(config.auth_api_url.clone())?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let state = AppState {
            config: config.clone(),
            commerce,
            sessions: Arc::new(sessions),
            login: Arc::new(login),
            http,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            state,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the shared session keys
    pub fn sessions(&self) -> Arc<SessionKeys> {
        self.state.sessions.clone()
    }

    /// Build the router
    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("storefront listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("storefront shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

//! Common test utilities - StoreTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Client};
use storefront::auth::SessionKeys;
use storefront::commerce::{MockCommerceBackend, Product};
use storefront::{Config, Server};
use tokio::task::JoinHandle;

pub const ORIGINAL_IMAGE: &str = "https://files.stripe.com/links/original-hat";
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// Backend holding one product, `prod_hat` with slug `blue-hat`
pub fn hat_backend() -> MockCommerceBackend {
    MockCommerceBackend::new().with_product(
        Product::new("prod_hat", "Blue Hat")
            .with_slug("blue-hat")
            .with_images(vec![ORIGINAL_IMAGE.to_string()]),
    )
}

/// Test harness that spawns a real storefront server on a random port
pub struct StoreTest {
    pub addr: SocketAddr,
    pub client: Client,
    pub backend: MockCommerceBackend,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl StoreTest {
    /// Start a new test server backed by `backend`
    pub async fn start(backend: MockCommerceBackend) -> Result<Self> {
        Self::start_with(backend, |_| {}).await
    }

    /// Start a server after letting the test adjust its config
    pub async fn start_with(
        backend: MockCommerceBackend,
        configure: impl FnOnce(&mut Config),
    ) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mut config = Config {
            bind_addr: addr,
            session_secret: "test-secret".to_string(),
            ..Config::default()
        };
        configure(&mut config);

        let server = Arc::new(Server::with_backend(config, Arc::new(backend.clone()))?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        // Redirects are asserted on, never followed
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .redirect(redirect::Policy::none())
            .build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            backend,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a GET request carrying a session cookie
    pub async fn get_with_session(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .header("cookie", format!("session={}", token))
            .send()
            .await?)
    }

    /// POST a multipart form
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .multipart(form)
            .send()
            .await?)
    }

    /// POST a url-encoded form
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        session: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .form(fields);
        if let Some(token) = session {
            request = request.header("cookie", format!("session={}", token));
        }
        Ok(request.send().await?)
    }

    /// Session keys the server signs with
    pub fn sessions(&self) -> Arc<SessionKeys> {
        self.server.sessions()
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for StoreTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

/// Multipart body for the image update route
pub fn image_form(slug: Option<&str>, image: Option<(&[u8], &str)>) -> Form {
    let mut form = Form::new();
    if let Some(slug) = slug {
        form = form.text("slug", slug.to_string());
    }
    if let Some((bytes, mime)) = image {
        let part = Part::bytes(bytes.to_vec())
            .file_name("edited-image.jpg")
            .mime_str(mime)
            .expect("valid mime");
        form = form.part("image", part);
    }
    form
}

/// Value of the `session` cookie set by a response, if any
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    set_cookie_headers(headers).into_iter().find_map(|raw| {
        raw.split(';')
            .next()
            .and_then(|pair| pair.trim().strip_prefix("session="))
            .map(str::to_string)
    })
}

/// All `Set-Cookie` header values
pub fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

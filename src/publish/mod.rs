//! Image edit-and-publish pipeline
//!
//! Drives one product image through an external editor:
//! 1. `start_edit` marks the image busy and returns the editor's launch
//!    settings (the URL it loads and its API key)
//! 2. `save` normalizes the editor output into an [`ImageBlob`], validates it,
//!    and publishes it through an [`ImagePublisher`]
//! 3. the displayed source follows the outcome (server URL, local preview,
//!    or unchanged)

mod session;
mod upload;

pub use session::EditSession;
pub use upload::UploadClient;

use std::sync::LazyLock;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::PROXY_IMAGE_PATH;
use crate::config::Config;
use crate::images::{
    same_origin, DataUrlError, ImageBlob, ImagePolicy, ImageRejection, DEFAULT_FILE_HOST,
};

/// Characters left alone by a URI component encoder
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Public demo key accepted by the hosted editor widget
pub const DEMO_EDITOR_API_KEY: &str = "FLMN24RR1234123412341234";

/// Product pages live at `/product/<slug>`
static PRODUCT_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/product/([^/?#]+)").unwrap());

/// What the editor hands back on save
#[derive(Debug, Clone)]
pub enum EditorOutput {
    /// Remote URL or `data:` URL
    Url(String),
    Bytes(ImageBlob),
}

/// Publish pipeline errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no product slug in page path {0:?}")]
    MissingSlug(String),

    #[error("failed to fetch edited image: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("failed to decode edited image: {0}")]
    DataUrl(#[from] DataUrlError),

    #[error("upload request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upload rejected ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("server returned no image URL")]
    MissingUrl,
}

/// Sends a validated image to wherever products are stored, returning the
/// image URL the server now serves for the product.
#[async_trait]
pub trait ImagePublisher: Send + Sync {
    async fn publish(&self, slug: &str, blob: &ImageBlob) -> Result<String, PublishError>;
}

/// Blocking, user-visible notices
pub trait Alerts: Send + Sync {
    fn alert(&self, message: &str);
}

/// Alerts written to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl Alerts for LogAlerts {
    fn alert(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Settings the external editor is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorLaunch {
    /// Image URL the editor loads
    pub source_url: String,
    pub api_key: String,
}

/// Result of one save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Server confirmed the new image URL
    Published(String),
    /// Blob failed validation; nothing was sent
    Rejected(ImageRejection),
    /// Editor output could not be turned into a blob
    LoadFailed,
    /// Upload failed; the local preview is shown instead
    UploadFailed,
}

/// Slug from a page path such as `/product/blue-hat`
pub fn derive_slug(path: &str) -> Option<String> {
    PRODUCT_PATH_REGEX
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_data_url(url: &str) -> bool {
    url.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// URL the editor should load for `src`.
///
/// The editor cannot authenticate against the private file host, so images
/// from it go through the proxy route.
pub fn editor_source_url(src: &str, trusted_file_host: &str) -> String {
    if same_origin(src, trusted_file_host) {
        format!(
            "{}?url={}",
            PROXY_IMAGE_PATH,
            utf8_percent_encode(src, URI_COMPONENT)
        )
    } else {
        src.to_string()
    }
}

/// One product image's edit-and-publish pipeline
pub struct ImageEditor<P, A> {
    slug: String,
    session: EditSession,
    publisher: P,
    alerts: A,
    policy: ImagePolicy,
    http: reqwest::Client,
    trusted_file_host: String,
    api_key: String,
}

impl<P: ImagePublisher, A: Alerts> ImageEditor<P, A> {
    /// Create an editor for `src`. Without an explicit slug it is derived
    /// from `page_path`.
    pub fn new(
        src: impl Into<String>,
        slug: Option<String>,
        page_path: &str,
        publisher: P,
        alerts: A,
    ) -> Result<Self, PublishError> {
        let slug = slug
            .filter(|s| !s.is_empty())
            .or_else(|| derive_slug(page_path))
            .ok_or_else(|| PublishError::MissingSlug(page_path.to_string()))?;

        Ok(Self {
            slug,
            session: EditSession::new(src),
            publisher,
            alerts,
            policy: ImagePolicy::default(),
            http: reqwest::Client::new(),
            trusted_file_host: DEFAULT_FILE_HOST.to_string(),
            api_key: DEMO_EDITOR_API_KEY.to_string(),
        })
    }

    pub fn with_policy(mut self, policy: ImagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_trusted_file_host(mut self, host: impl Into<String>) -> Self {
        self.trusted_file_host = host.into();
        self
    }

    /// Editor key to launch with; `None` or empty keeps the demo key
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        self
    }

    /// Take the trusted file host and editor key from server config
    pub fn with_config(self, config: &Config) -> Self {
        self.with_trusted_file_host(config.trusted_file_host.clone())
            .with_api_key(config.editor_api_key.clone())
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Open the editor
    pub fn start_edit(&mut self) -> EditorLaunch {
        self.session.begin();
        EditorLaunch {
            source_url: editor_source_url(self.session.displayed_src(), &self.trusted_file_host),
            api_key: self.api_key.clone(),
        }
    }

    /// Editor closed without saving, or failed to export
    pub fn cancel(&mut self) {
        self.session.abandon();
    }

    /// Handle the editor's save callback
    pub async fn save(&mut self, output: EditorOutput) -> SaveOutcome {
        let (blob, preview) = match self.normalize(output).await {
            Ok(normalized) => normalized,
            Err(e) => {
                error!("Could not load edited image for '{}': {}", self.slug, e);
                self.session.abandon();
                return SaveOutcome::LoadFailed;
            }
        };

        if let Err(rejection) = self.policy.check(&blob) {
            self.alerts.alert(&rejection.to_string());
            self.session.abandon();
            return SaveOutcome::Rejected(rejection);
        }

        self.session.set_preview(preview);

        match self.publisher.publish(&self.slug, &blob).await {
            Ok(url) => {
                info!("Published image for '{}': {}", self.slug, url);
                self.session.confirm(url.clone());
                SaveOutcome::Published(url)
            }
            Err(e) => {
                self.alerts.alert(&format!("Failed to upload image: {}", e));
                self.session.fall_back_to_preview();
                SaveOutcome::UploadFailed
            }
        }
    }

    /// Turn editor output into a blob plus the source to preview it with
    async fn normalize(&self, output: EditorOutput) -> Result<(ImageBlob, String), PublishError> {
        match output {
            EditorOutput::Bytes(blob) => {
                let preview = blob.to_data_url();
                Ok((blob, preview))
            }
            EditorOutput::Url(url) if is_data_url(&url) => {
                Ok((ImageBlob::from_data_url(&url)?, url))
            }
            EditorOutput::Url(url) => {
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(PublishError::Fetch)?;
                let mime_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = response.bytes().await.map_err(PublishError::Fetch)?;
                Ok((ImageBlob::new(bytes, mime_type), url))
            }
        }
    }
}

//! Upload client for the image update route

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use super::{ImagePublisher, PublishError};
use crate::api::{UpdateImageResponse, UPDATE_IMAGE_PATH};
use crate::config::Config;
use crate::error::ErrorResponse;
use crate::images::ImageBlob;

/// Base name of the uploaded file; the extension follows the MIME type
const UPLOAD_FILE_STEM: &str = "edited-image";

/// Posts edited images to a storefront server
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: Client,
    endpoint: String,
}

impl UploadClient {
    /// `base_url` is the storefront's public URL, e.g. `https://shop.example.com`
    pub fn new(base_url: &str) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(PublishError::Transport)?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), UPDATE_IMAGE_PATH),
        })
    }

    /// Client for the storefront at `config.public_url`
    pub fn from_config(config: &Config) -> Result<Self, PublishError> {
        Self::new(&config.public_url)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImagePublisher for UploadClient {
    async fn publish(&self, slug: &str, blob: &ImageBlob) -> Result<String, PublishError> {
        let part = Part::bytes(blob.bytes().to_vec())
            .file_name(format!("{}.{}", UPLOAD_FILE_STEM, blob.file_extension()))
            .mime_str(blob.mime_type())
            .map_err(PublishError::Transport)?;
        let form = Form::new().text("slug", slug.to_string()).part("image", part);

        debug!("Uploading {} bytes for '{}' to {}", blob.size(), slug, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(PublishError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(PublishError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let reply: UpdateImageResponse = response.json().await.map_err(PublishError::Transport)?;
        reply
            .product
            .images
            .into_iter()
            .next()
            .ok_or(PublishError::MissingUrl)
    }
}

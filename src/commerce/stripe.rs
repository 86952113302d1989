//! Stripe REST client
//!
//! Speaks just enough of the Stripe API for product image publishing:
//! list products, upload a file, link it publicly, update product images.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    BackendFile, CommerceBackend, CommerceError, FileLink, FilePurpose, FileUpload, Product,
    ProductList, Result,
};
use crate::Config;

/// Pinned API version sent with every request
pub const STRIPE_API_VERSION: &str = "2025-06-30.basil";

/// Stripe caps list pages at this size
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe API client
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
    files_base: String,
}

impl StripeClient {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        files_base: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: trim_base(api_base.into()),
            files_base: trim_base(files_base.into()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
            config.stripe_files_base.clone(),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION)
    }

    /// Decode a success body, or turn an error body into `CommerceError::Api`
    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            warn!("Stripe API error: {} - {}", status, message);
            return Err(CommerceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[async_trait]
impl CommerceBackend for StripeClient {
    async fn list_products(&self, limit: usize) -> Result<Vec<Product>> {
        let limit = limit.min(MAX_PAGE_SIZE);
        debug!("Listing up to {} products", limit);

        let response = self
            .authorized(self.client.get(format!("{}/v1/products", self.api_base)))
            .query(&[("limit", limit.to_string()), ("active", "true".to_string())])
            .send()
            .await?;

        let list: ProductList = Self::parse(response).await?;
        Ok(list.data)
    }

    async fn upload_file(&self, purpose: FilePurpose, upload: FileUpload) -> Result<BackendFile> {
        debug!(
            "Uploading file '{}' ({} bytes, {})",
            upload.name,
            upload.data.len(),
            upload.mime_type
        );

        let part = Part::bytes(upload.data.to_vec())
            .file_name(upload.name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);

        let response = self
            .authorized(self.client.post(format!("{}/v1/files", self.files_base)))
            .multipart(form)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn create_file_link(&self, file_id: &str) -> Result<FileLink> {
        debug!("Creating file link for {}", file_id);

        let response = self
            .authorized(self.client.post(format!("{}/v1/file_links", self.api_base)))
            .form(&[("file", file_id)])
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn update_product_images(
        &self,
        product_id: &str,
        images: Vec<String>,
    ) -> Result<Product> {
        debug!("Setting {} image(s) on product {}", images.len(), product_id);

        // An empty string clears the list; otherwise images[0], images[1], ...
        let params: Vec<(String, String)> = if images.is_empty() {
            vec![("images".to_string(), String::new())]
        } else {
            images
                .into_iter()
                .enumerate()
                .map(|(i, url)| (format!("images[{}]", i), url))
                .collect()
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/v1/products/{}", self.api_base, product_id)),
            )
            .form(&params)
            .send()
            .await?;

        Self::parse(response).await
    }
}

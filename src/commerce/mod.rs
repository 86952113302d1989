//! Commerce backend integration
//!
//! Products, file uploads and public file links live in an external
//! Stripe-style backend. The server talks to it through [`CommerceBackend`]
//! so tests can swap in [`MockCommerceBackend`].

pub mod mock;
pub mod stripe;
mod types;

pub use mock::MockCommerceBackend;
pub use stripe::StripeClient;
pub use types::{BackendFile, FileLink, FilePurpose, FileUpload, Product, ProductList};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// How many products a slug lookup scans. Products past this window cannot
/// be found by slug.
pub const PRODUCT_SCAN_LIMIT: usize = 100;

/// Commerce backend errors
#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("commerce API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("unknown file: {0}")]
    UnknownFile(String),
}

pub type Result<T> = std::result::Result<T, CommerceError>;

#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// List up to `limit` products, newest first
    async fn list_products(&self, limit: usize) -> Result<Vec<Product>>;

    async fn upload_file(&self, purpose: FilePurpose, upload: FileUpload) -> Result<BackendFile>;

    async fn create_file_link(&self, file_id: &str) -> Result<FileLink>;

    /// Replace the product's image list
    async fn update_product_images(&self, product_id: &str, images: Vec<String>)
        -> Result<Product>;

    /// Find a product by `metadata.slug` within the first
    /// [`PRODUCT_SCAN_LIMIT`] listed products.
    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let products = self.list_products(PRODUCT_SCAN_LIMIT).await?;
        debug!("Scanning {} products for slug '{}'", products.len(), slug);
        Ok(products.into_iter().find(|p| p.slug() == Some(slug)))
    }
}

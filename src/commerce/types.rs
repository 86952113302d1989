//! Commerce backend records

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A product as held by the commerce backend.
///
/// Fields this service does not use are kept in `extra` so the record can be
/// returned to clients unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: HashMap::new(),
            images: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Human-readable key stored under `metadata.slug`
    pub fn slug(&self) -> Option<&str> {
        self.metadata.get("slug").map(String::as_str)
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.metadata.insert("slug".to_string(), slug.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Paged list envelope
#[derive(Debug, Deserialize)]
pub struct ProductList {
    pub data: Vec<Product>,
    #[serde(default)]
    pub has_more: bool,
}

/// What an uploaded file will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilePurpose {
    #[default]
    BusinessLogo,
    BusinessIcon,
}

impl FilePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilePurpose::BusinessLogo => "business_logo",
            FilePurpose::BusinessIcon => "business_icon",
        }
    }
}

/// File contents to upload
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// An uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFile {
    pub id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// A link granting public read access to a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLink {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

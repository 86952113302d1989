//! Pre-upload validation

use thiserror::Error;

use super::ImageBlob;

/// Largest image accepted for publishing (10 MiB, inclusive)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for publishing
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Why a blob was refused. The messages are shown to the operator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageRejection {
    #[error("Invalid image type. Only JPG, PNG, GIF, and WEBP are allowed.")]
    UnsupportedType(String),

    #[error("Image is too large. Maximum size is {}MB.", .max / (1024 * 1024))]
    TooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct ImagePolicy {
    pub max_bytes: usize,
    pub allowed_types: &'static [&'static str],
}

impl ImagePolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            allowed_types: ALLOWED_IMAGE_TYPES,
        }
    }

    /// Type is checked before size
    pub fn check(&self, blob: &ImageBlob) -> Result<(), ImageRejection> {
        let essence = blob.mime_essence();
        if !self.allowed_types.contains(&essence.as_str()) {
            return Err(ImageRejection::UnsupportedType(blob.mime_type().to_string()));
        }

        if blob.size() > self.max_bytes {
            return Err(ImageRejection::TooLarge {
                size: blob.size(),
                max: self.max_bytes,
            });
        }

        Ok(())
    }
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::new(MAX_IMAGE_BYTES)
    }
}

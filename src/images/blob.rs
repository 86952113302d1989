//! Normalized image payloads and `data:` URL handling

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors decoding a `data:` URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data: URL")]
    NotDataUrl,

    #[error("data: URL has no payload separator")]
    MissingComma,

    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// Raw image bytes plus their declared MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    bytes: Bytes,
    mime_type: String,
}

impl ImageBlob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased MIME type without parameters
    pub fn mime_essence(&self) -> String {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// File extension matching the MIME type
    pub fn file_extension(&self) -> &'static str {
        match self.mime_essence().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }

    /// Encode as a base64 `data:` URL, used as a local preview source
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    /// Decode `data:[<mediatype>][;base64],<payload>`.
    ///
    /// A missing media type defaults to `text/plain`, as browsers do.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &url[5..])
            .ok_or(DataUrlError::NotDataUrl)?;

        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingComma)?;

        let mut params = header.split(';').map(str::trim);
        let mime = params.next().unwrap_or_default();
        let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));
        let mime_type = if mime.is_empty() {
            "text/plain".to_string()
        } else {
            mime.to_ascii_lowercase()
        };

        let bytes = if is_base64 {
            let compact: String = percent_decode_str(payload)
                .decode_utf8_lossy()
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            BASE64
                .decode(compact)
                .map_err(|e| DataUrlError::Base64(e.to_string()))?
        } else {
            percent_decode_str(payload).collect()
        };

        Ok(Self::new(bytes, mime_type))
    }
}

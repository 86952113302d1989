//! Image blobs and the upload policy
//!
//! Provides:
//! - `ImageBlob`, the normalized form of whatever the editor hands back
//! - `ImagePolicy`, the MIME allow-list and size cap checked before upload
//! - Origin matching for the trusted private file host

mod blob;
mod policy;

pub use blob::{DataUrlError, ImageBlob};
pub use policy::{ImagePolicy, ImageRejection, ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES};

use url::Url;

/// Private file host of the commerce backend
pub const DEFAULT_FILE_HOST: &str = "https://files.stripe.com";

/// True when `candidate` parses and has exactly the origin of `trusted`
/// (scheme, host and port).
pub fn same_origin(candidate: &str, trusted: &str) -> bool {
    match (Url::parse(candidate), Url::parse(trusted)) {
        (Ok(candidate), Ok(trusted)) => {
            let origin = candidate.origin();
            origin.is_tuple() && origin == trusted.origin()
        }
        _ => false,
    }
}

//! Product image update endpoint
//!
//! POST /api/update-stripe-image - multipart `{slug, image}`; stores the
//! image in the commerce backend and makes it the product's only image.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::commerce::{FilePurpose, FileUpload, Product};
use crate::error::ApiError;

pub const UPDATE_IMAGE_PATH: &str = "/api/update-stripe-image";

/// Build the image update router
pub fn router() -> Router<AppState> {
    Router::new().route(UPDATE_IMAGE_PATH, post(update_image))
}

/// Successful update reply
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateImageResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Default)]
struct UpdateImageForm {
    slug: Option<String>,
    image: Option<FileUpload>,
}

/// Oversized bodies surface as multipart errors once the limit is hit
fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Image is too large".to_string())
    } else {
        ApiError::Validation(format!("{}: {}", context, e.body_text()))
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<UpdateImageForm, ApiError> {
    let mut form = UpdateImageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed form data", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("slug") => {
                let slug = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Malformed slug", e))?;
                form.slug = Some(slug.trim().to_string()).filter(|s| !s.is_empty());
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Malformed image", e))?;
                form.image = Some(FileUpload {
                    name: file_name,
                    mime_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn update_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UpdateImageResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::Validation(format!("Expected multipart form: {}", e.body_text()))
    })?;
    let form = read_form(&mut multipart).await?;
    let (slug, image) = match (form.slug, form.image) {
        (Some(slug), Some(image)) => (slug, image),
        _ => return Err(ApiError::Validation("Missing slug or image".to_string())),
    };

    let product = state
        .commerce
        .find_product_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let image_size = image.data.len();
    let file = state
        .commerce
        .upload_file(FilePurpose::BusinessLogo, image)
        .await?;

    let link = state.commerce.create_file_link(&file.id).await?;
    let image_url = link.url.ok_or_else(|| {
        error!("File link {} for {} has no URL", link.id, file.id);
        ApiError::internal("Failed to get image URL")
    })?;

    // Replaces every existing image; earlier images are dropped.
    let updated = state
        .commerce
        .update_product_images(&product.id, vec![image_url.clone()])
        .await?;

    info!(
        "Published new image for '{}' ({} bytes): {}",
        slug, image_size, image_url
    );

    Ok(Json(UpdateImageResponse {
        success: true,
        product: updated,
    }))
}

//! Product image upload and removal.

use bubblemart_core::FieldErrors;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::mutation_failed;
use crate::api::ApiError;
use crate::error::{CommerceError, Result};
use crate::state::ClientState;

const UPLOAD_FAILED: &str = "Could not upload image";
const DELETE_FALLBACK: &str = "Unknown error occurred whilst deleting image!";

/// Where an uploaded image ended up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    pub link: String,
}

#[derive(Serialize)]
struct DeleteImage<'a> {
    path: &'a str,
}

/// Image upload service.
#[derive(Clone)]
pub struct UploadService {
    state: ClientState,
}

impl UploadService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Upload one image as the `image` field of a multipart form.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error on the `image` field for non-image MIME
    /// types (no request is made), or an error if the upload fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage> {
        if let Err(errors) = check_image(mime, bytes.len()) {
            self.state
                .events()
                .error(errors.first("image").unwrap_or(UPLOAD_FAILED));
            return Err(errors.into());
        }

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| self.upload_failed(ApiError::Network(e).into()))?;
        let form = Form::new().part("image", part);

        let image = self
            .state
            .api()
            .post_multipart::<UploadedImage>("/upload", form)
            .await
            .map_err(|e| self.upload_failed(e.into()))?
            .into_data();
        info!(link = %image.link, "Image uploaded");
        Ok(image)
    }

    fn upload_failed(&self, err: CommerceError) -> CommerceError {
        let err = self.state.intercept(err);
        if !err.is_silent() && !err.is_unauthorized() {
            self.state.events().error(UPLOAD_FAILED);
        }
        err
    }

    /// Remove a previously uploaded image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_image(&self, path: &str) -> Result<()> {
        self.state
            .api()
            .delete_with_body("/upload", &DeleteImage { path })
            .await
            .map_err(|e| mutation_failed(&self.state, e.into(), DELETE_FALLBACK))
    }
}

fn check_image(mime: &str, len: usize) -> std::result::Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if len == 0 {
        errors.add("image", "Please select an image to upload");
    } else if !mime.trim().to_ascii_lowercase().starts_with("image/") {
        errors.add("image", "Please upload an image file");
    }
    errors.into_result()
}

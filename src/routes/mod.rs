pub mod admin;
pub mod animals;
pub mod applications;
pub mod dashboard;
pub mod donations;
pub mod home;
pub mod projects;
pub mod shelters;

use serde::Deserialize;

use crate::error::AppError;
use crate::storage;

#[derive(Deserialize)]
pub struct UploadRequest {
    pub content_type: String,
}

impl UploadRequest {
    pub fn extension(&self) -> Result<&'static str, AppError> {
        storage::image_extension(&self.content_type)
            .ok_or_else(|| AppError::Validation("Unsupported file type".to_string()))
    }
}

use std::time::Duration;

use opendal::Operator;
use serde::Serialize;
use uuid::Uuid;

use crate::config::StorageConfig;

pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct Storage {
    operator: Operator,
    public_base_url: String,
}

#[derive(Serialize, Debug)]
pub struct UploadTicket {
    pub upload_url: String,
    pub method: String,
    pub key: String,
    pub public_url: String,
    pub expires_in: u64,
}

impl Storage {
    pub fn new(operator: Operator, public_base_url: impl Into<String>) -> Self {
        Self {
            operator,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn s3(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let builder = opendal::services::S3::default()
            .endpoint(&cfg.endpoint)
            .bucket(&cfg.bucket)
            .region(&cfg.region)
            .access_key_id(&cfg.access_key_id)
            .secret_access_key(&cfg.secret_access_key);
        let operator = Operator::new(builder)?.finish();
        Ok(Self::new(operator, cfg.public_url.clone()))
    }

    /// Local fallback with no presign support.
    pub fn memory(public_base_url: &str) -> anyhow::Result<Self> {
        let operator = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::new(operator, public_base_url))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    pub async fn presign_upload(&self, key: String) -> Result<UploadTicket, opendal::Error> {
        let req = self.operator.presign_write(&key, UPLOAD_URL_TTL).await?;
        Ok(UploadTicket {
            upload_url: req.uri().to_string(),
            method: req.method().to_string(),
            public_url: self.public_url(&key),
            key,
            expires_in: UPLOAD_URL_TTL.as_secs(),
        })
    }
}

/// Maps an accepted image content type to its file extension.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub fn animal_photo_key(animal_id: &str, ext: &str) -> String {
    format!("animals/{}/{}.{}", animal_id, Uuid::new_v4(), ext)
}

pub fn shelter_logo_key(shelter_id: &str, ext: &str) -> String {
    format!("shelters/{}/logo-{}.{}", shelter_id, Uuid::new_v4(), ext)
}

pub fn project_image_key(shelter_id: &str, ext: &str) -> String {
    format!("projects/{}/{}.{}", shelter_id, Uuid::new_v4(), ext)
}

/// True when `key` sits directly under `prefix` and cannot climb out of it.
pub fn key_belongs_to(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/') && !rest.contains(".."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_layout() {
        let key = animal_photo_key("a1", "png");
        assert!(key.starts_with("animals/a1/") && key.ends_with(".png"));
        assert!(key_belongs_to(&key, "animals/a1"));
        assert!(!key_belongs_to(&key, "animals/a2"));

        let logo = shelter_logo_key("s1", "jpg");
        assert!(logo.starts_with("shelters/s1/logo-"));

        let project = project_image_key("s1", "webp");
        assert!(project.starts_with("projects/s1/") && project.ends_with(".webp"));
    }

    #[test]
    fn rejects_traversal_and_nested_keys() {
        assert!(!key_belongs_to("animals/a1/../a2/x.png", "animals/a1"));
        assert!(!key_belongs_to("animals/a1/", "animals/a1"));
        assert!(!key_belongs_to("animals/a10/x.png", "animals/a1"));
    }

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn public_url_joins_base_and_key() {
        let storage = Storage::memory("https://cdn.example/bucket/").unwrap();
        assert_eq!(
            storage.public_url("animals/a1/x.png"),
            "https://cdn.example/bucket/animals/a1/x.png"
        );
    }
}

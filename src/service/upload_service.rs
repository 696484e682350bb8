// service/upload_service.rs
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::service::error::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub delete_handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostResponse {
    #[serde(default)]
    success: bool,
    data: Option<HostImage>,
    error: Option<HostError>,
}

#[derive(Debug, Deserialize)]
struct HostImage {
    url: String,
    delete_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostError {
    message: String,
}

/// Accepts raw base64 or a `data:image/...;base64,` URL.
pub fn strip_data_url(image: &str) -> &str {
    let image = image.trim();
    match image.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => image,
    }
}

/// Decodes to check the payload and returns its size in bytes.
pub fn decoded_size(payload: &str) -> Result<usize, ServiceError> {
    STANDARD
        .decode(payload)
        .map(|bytes| bytes.len())
        .map_err(|_| ServiceError::Validation("Image must be base64 encoded".to_string()))
}

fn safe_name(folder: Option<&str>) -> String {
    let folder: String = folder
        .unwrap_or("uploads")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let folder = if folder.is_empty() { "uploads".to_string() } else { folder };
    format!("{}-{}", folder, uuid::Uuid::new_v4())
}

/// Forwards images to the external host and keeps only its URLs.
#[derive(Debug, Clone)]
pub struct UploadService {
    client: reqwest::Client,
    host_url: String,
    api_key: Option<String>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(host_url: String, api_key: Option<String>, max_upload_mb: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            host_url,
            api_key,
            max_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        }
    }

    pub async fn upload_image(
        &self,
        image: &str,
        folder: Option<&str>,
    ) -> Result<UploadedImage, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or(ServiceError::UploadUnavailable)?;

        let payload = strip_data_url(image);
        let size = decoded_size(payload)?;
        if size == 0 {
            return Err(ServiceError::Validation("Image is empty".to_string()));
        }
        if size > self.max_bytes {
            return Err(ServiceError::Validation(format!(
                "Image is larger than {} MB",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let name = safe_name(folder);
        let response = self
            .client
            .post(&self.host_url)
            .form(&[("key", api_key), ("image", payload), ("name", name.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body: HostResponse = response.json().await?;

        match body.data {
            Some(image) if body.success && status.is_success() => {
                tracing::info!("Uploaded image {} ({} bytes)", name, size);
                Ok(UploadedImage {
                    url: image.url,
                    delete_handle: image.delete_url,
                })
            }
            _ => {
                let message = body
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| format!("upload failed with status {}", status));
                tracing::error!("Image host rejected upload: {}", message);
                Err(ServiceError::Upstream(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_are_unwrapped() {
        assert_eq!(strip_data_url("data:image/png;base64,aGVsbG8="), "aGVsbG8=");
        assert_eq!(strip_data_url("  aGVsbG8=  "), "aGVsbG8=");
    }

    #[test]
    fn size_is_measured_after_decoding() {
        assert_eq!(decoded_size("aGVsbG8=").unwrap(), 5);
        assert!(decoded_size("not base64!").is_err());
    }

    #[test]
    fn folder_names_are_sanitized() {
        let name = safe_name(Some("../complaints"));
        assert!(name.starts_with("complaints-"));
        assert!(safe_name(None).starts_with("uploads-"));
    }

    #[test]
    fn absurd_upload_limits_saturate() {
        let service = UploadService::new("http://localhost:1".into(), None, usize::MAX);
        assert_eq!(service.max_bytes, usize::MAX);
        let service = UploadService::new("http://localhost:1".into(), None, 2);
        assert_eq!(service.max_bytes, 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn missing_key_means_uploads_are_off() {
        let service = UploadService::new("http://localhost:1".into(), None, 1);
        let err = service.upload_image("aGVsbG8=", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::UploadUnavailable));
    }

    #[tokio::test]
    async fn oversized_images_never_leave_the_server() {
        let service = UploadService::new("http://localhost:1".into(), Some("k".into()), 0);
        let err = service.upload_image("aGVsbG8=", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

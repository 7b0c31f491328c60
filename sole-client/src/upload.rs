//! Image upload client
//!
//! Unsigned multipart upload to the hosted image service: a `file` part plus
//! the `upload_preset` field. A successful response carries `secure_url`;
//! failures carry `error.message`, sometimes even on a 2xx status.

use reqwest::{Client, multipart};
use std::time::Duration as StdDuration;

use crate::{ClientError, ClientResult, StoreConfig};
use shared::ImageFile;

/// Client for the hosted image upload service
#[derive(Debug, Clone)]
pub struct ImageUploader {
    client: Client,
    url: String,
    preset: String,
    timeout: StdDuration,
}

impl ImageUploader {
    /// Create an uploader sharing the store's HTTP client
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            url: config.upload_url.clone(),
            preset: config.upload_preset.clone(),
            timeout: StdDuration::from_secs(config.timeout),
        }
    }

    /// Upload an image, returning its hosted URL
    pub async fn upload(&self, file: &ImageFile) -> ClientResult<String> {
        let mime = mime_guess::from_path(&file.filename).first_or_octet_stream();
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(mime.as_ref())
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        // The host reports rejections in the body regardless of status
        if let Some(message) = body.pointer("/error/message").and_then(|v| v.as_str()) {
            tracing::warn!(filename = %file.filename, error = %message, "Image upload rejected");
            return Err(ClientError::Upload(message.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Upload(format!(
                "upload failed with status {status}"
            )));
        }

        match body.get("secure_url").and_then(|v| v.as_str()) {
            Some(url) => {
                tracing::debug!(filename = %file.filename, url = %url, "Image uploaded");
                Ok(url.to_string())
            }
            None => Err(ClientError::Upload(
                "response missing secure_url".to_string(),
            )),
        }
    }
}

//! Signed uploads to Cloudinary.

use std::time::Duration;

use log::{error, info};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{CloudinaryConfig, Error, Result};

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

/// Cloudinary signature: SHA-256 over `k=v&...` sorted by key, followed by the secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

#[derive(Clone)]
pub struct CloudinaryClient {
    http: Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("upload_url", &self.upload_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .finish()
    }
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig, timeout: Duration) -> Result<Self> {
        let cloud_name = config
            .cloud_name
            .as_deref()
            .ok_or(Error::Misconfigured("CLOUDINARY_CLOUD_NAME"))?;
        let api_key = config.api_key.clone().ok_or(Error::Misconfigured("CLOUDINARY_API_KEY"))?;
        let api_secret = config
            .api_secret
            .clone()
            .ok_or(Error::Misconfigured("CLOUDINARY_API_SECRET"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            upload_url: format!("{}/v1_1/{}/image/upload", config.api_base.trim_end_matches('/'), cloud_name),
            api_key,
            api_secret,
            folder: config.folder.clone(),
        })
    }

    /// Upload an image given as a data URL (Cloudinary accepts data URIs as `file`).
    pub fn upload_data_url(&self, data_url: &str) -> Result<UploadedImage> {
        let now = chrono::Utc::now();
        let timestamp = now.timestamp().to_string();
        let public_id = format!("soulpet_{}", now.timestamp_millis());

        let signed = [
            ("folder", self.folder.clone()),
            ("overwrite", "true".to_string()),
            ("public_id", public_id),
            ("timestamp", timestamp),
        ];
        let signature = sign_params(&signed, &self.api_secret);

        let mut form: Vec<(&str, String)> = signed.to_vec();
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        form.push(("file", data_url.to_string()));

        let resp = self.http.post(&self.upload_url).form(&form).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            error!("cloudinary upload failed: {} {}", status, body);
            return Err(Error::NetworkError(format!("Cloudinary upload failed with status {}", status)));
        }
        let uploaded: UploadedImage = serde_json::from_str(&body)
            .map_err(|e| Error::NetworkError(format!("Unexpected Cloudinary response: {}", e)))?;
        info!("uploaded image to cloudinary as {}", uploaded.public_id);
        Ok(uploaded)
    }
}

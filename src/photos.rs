//! Member photo hosting.
//!
//! Photos live outside the database; a member row only stores the URL the
//! host returned. Two hosts exist: Cloudinary (used when credentials are
//! configured) and a local directory served under `/uploads`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const CLOUDINARY_FOLDER: &str = "gym-members";
const CLOUDINARY_TRANSFORMATION: &str = "c_fill,g_face,h_300,w_300";

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("{0}")]
    Rejected(&'static str),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
}

#[async_trait]
pub trait PhotoHost: Send + Sync {
    /// Store the image and return the URL to save on the member.
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, PhotoError>;

    /// Remove a previously returned URL. URLs this host did not issue are ignored.
    async fn delete(&self, url: &str) -> Result<(), PhotoError>;
}

/// Delete a photo, logging instead of failing. The member row is already gone
/// or updated by the time this runs.
pub async fn delete_best_effort(host: &dyn PhotoHost, url: &str) {
    if let Err(e) = host.delete(url).await {
        warn!(url, error = %e, "photo cleanup failed");
    }
}

fn unique_stem() -> String {
    format!(
        "member-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().as_u128() % 1_000_000_000
    )
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryHost {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.cloud_name, action
        )
    }

    /// Cloudinary request signature: the signed parameters sorted by name,
    /// joined as `k=v&k=v`, followed by the API secret, hashed with SHA-256.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by_key(|(k, _)| *k);
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// `https://res.cloudinary.com/<cloud>/image/upload/v1/gym-members/member-1.jpg`
/// → `gym-members/member-1`.
pub fn cloudinary_public_id(photo_url: &str) -> Option<String> {
    let url = url::Url::parse(photo_url).ok()?;
    if !url.host_str()?.ends_with("cloudinary.com") {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }
    let folder = segments[segments.len() - 2];
    let file = segments[segments.len() - 1];
    let stem = file.split('.').next().unwrap_or(file);
    Some(format!("{folder}/{stem}"))
}

#[async_trait]
impl PhotoHost for CloudinaryHost {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, PhotoError> {
        let timestamp = Utc::now().timestamp().to_string();
        let public_id = unique_stem();
        let signature = self.sign(&[
            ("folder", CLOUDINARY_FOLDER),
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", CLOUDINARY_TRANSFORMATION),
        ]);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", CLOUDINARY_FOLDER)
            .text("public_id", public_id)
            .text("transformation", CLOUDINARY_TRANSFORMATION)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let resp = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PhotoError::Upload(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PhotoError::Upload(format!("{status}: {body}")));
        }

        let uploaded: UploadResponse = resp
            .json()
            .await
            .map_err(|e| PhotoError::Upload(e.to_string()))?;
        debug!(url = %uploaded.secure_url, "uploaded photo to cloudinary");
        Ok(uploaded.secure_url)
    }

    async fn delete(&self, url: &str) -> Result<(), PhotoError> {
        let Some(public_id) = cloudinary_public_id(url) else {
            return Ok(());
        };

        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let resp = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature_algorithm", "sha256"),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PhotoError::Delete(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PhotoError::Delete(format!("status {}", resp.status())));
        }
        Ok(())
    }
}

/// Stores photos on disk and serves them from `<base_url>/uploads/<file>`.
pub struct LocalPhotoHost {
    dir: PathBuf,
    base_url: String,
}

impl LocalPhotoHost {
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_prefix(&self) -> String {
        format!("{}/uploads/", self.base_url)
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

#[async_trait]
impl PhotoHost for LocalPhotoHost {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, PhotoError> {
        let name = format!("{}.{}", unique_stem(), extension_of(filename));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PhotoError::Upload(e.to_string()))?;
        tokio::fs::write(self.dir.join(&name), bytes)
            .await
            .map_err(|e| PhotoError::Upload(e.to_string()))?;

        Ok(format!("{}{}", self.url_prefix(), name))
    }

    async fn delete(&self, url: &str) -> Result<(), PhotoError> {
        let prefix = self.url_prefix();
        let Some(name) = url.strip_prefix(&prefix) else {
            return Ok(());
        };
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Ok(());
        }

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PhotoError::Delete(e.to_string())),
        }
    }
}

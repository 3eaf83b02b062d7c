//! Image placement.
//!
//! Uploaded images land either on the local disk under the configured
//! upload directory or on the remote media host when its credentials are
//! present. Deletion is best-effort in both cases: records are removed
//! even when their backing image cannot be.

use crate::config::{MediaHostConfig, UploadConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;

/// Extensions accepted for image uploads
const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Error types for media placement
#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    /// Invalid input; the message is shown to the user as-is
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Where a placed image ended up
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Public location, either `/uploads/{name}` or the host's HTTPS URL
    pub url: String,
    /// Remote object id used for deletion; empty for local placements
    pub delete_token: String,
}

/// Image placement service
pub struct MediaService {
    uploads: UploadConfig,
    media_host: MediaHostConfig,
    http: reqwest::Client,
}

impl MediaService {
    /// Create a new media service from the upload and media host config
    pub fn new(uploads: UploadConfig, media_host: MediaHostConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            uploads,
            media_host,
            http,
        }
    }

    /// Place an uploaded image and return its location and deletion token.
    ///
    /// The extension check is a case-insensitive suffix match only; file
    /// content is not sniffed. Remote placement is used when the media
    /// host credentials are configured, local disk otherwise.
    ///
    /// # Errors
    ///
    /// - `ValidationError` when no file was supplied or the extension is
    ///   not an allowed image format
    /// - `InternalError` when the disk write or host upload fails
    pub async fn place(
        &self,
        data: Vec<u8>,
        filename: &str,
        subfolder: &str,
    ) -> Result<PlacedImage, MediaServiceError> {
        if filename.is_empty() {
            return Err(MediaServiceError::ValidationError(
                "Aucun fichier sélectionné.".to_string(),
            ));
        }

        if !is_allowed_image(filename) {
            return Err(MediaServiceError::ValidationError(
                "Format non autorisé (png/jpg/jpeg/webp).".to_string(),
            ));
        }

        if self.media_host.is_configured() {
            self.place_remote(data, filename, subfolder).await
        } else {
            self.place_local(data, filename).await
        }
    }

    /// Best-effort removal of a placed image. Never fails the caller.
    ///
    /// A non-empty deletion token is tried against the remote host first;
    /// local paths under `/uploads/` are removed from disk. Failures are
    /// logged and swallowed.
    pub async fn delete(&self, url: &str, delete_token: &str) {
        if !delete_token.is_empty() && self.media_host.is_configured() {
            match self.delete_remote(delete_token).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(token = %delete_token, error = %e, "Remote image delete failed")
                }
            }
        }

        if let Some(name) = url.strip_prefix("/uploads/") {
            if let Err(e) = self.delete_local(name).await {
                tracing::warn!(url = %url, error = %e, "Local image delete failed");
            }
        }
    }

    // ========================================================================
    // Local placement
    // ========================================================================

    async fn place_local(
        &self,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<PlacedImage, MediaServiceError> {
        let dir = &self.uploads.dir;
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .context("Failed to create upload directory")?;
        }

        let safe = sanitize_filename(filename)?;
        let (base, ext) = split_extension(&safe);

        // Probe for a free name so an existing file is never overwritten.
        let mut candidate = safe.clone();
        let mut path = dir.join(&candidate);
        let mut i = 1;
        while path.exists() {
            candidate = format!("{}-{}{}", base, i, ext);
            path = dir.join(&candidate);
            i += 1;
        }

        fs::write(&path, &data)
            .await
            .context("Failed to save uploaded file")?;

        Ok(PlacedImage {
            url: format!("/uploads/{}", candidate),
            delete_token: String::new(),
        })
    }

    async fn delete_local(&self, name: &str) -> Result<()> {
        // Refuse anything that could escape the upload directory.
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            anyhow::bail!("Refusing suspicious upload path: {}", name);
        }

        let path = self.uploads.dir.join(name);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .context("Failed to remove uploaded file")?;
        }

        Ok(())
    }

    // ========================================================================
    // Remote placement
    // ========================================================================

    async fn place_remote(
        &self,
        data: Vec<u8>,
        filename: &str,
        subfolder: &str,
    ) -> Result<PlacedImage, MediaServiceError> {
        let host = &self.media_host;
        let url = format!("{}/{}/image/upload", host.api_base, host.account);
        let folder = format!("{}/{}", host.folder, subfolder);

        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("folder", folder)
            .part("file", part);

        let response = self
            .http
            .post(&url)
            .basic_auth(&host.api_key, Some(&host.api_secret))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach media host")?;

        if !response.status().is_success() {
            return Err(MediaServiceError::InternalError(anyhow::anyhow!(
                "Media host upload failed with status {}",
                response.status()
            )));
        }

        let uploaded: RemoteUpload = response
            .json()
            .await
            .context("Failed to parse media host response")?;

        Ok(PlacedImage {
            url: uploaded.secure_url,
            delete_token: uploaded.public_id,
        })
    }

    async fn delete_remote(&self, delete_token: &str) -> Result<()> {
        let host = &self.media_host;
        let url = format!("{}/{}/image/destroy", host.api_base, host.account);

        let response = self
            .http
            .post(&url)
            .basic_auth(&host.api_key, Some(&host.api_secret))
            .form(&[("public_id", delete_token)])
            .send()
            .await
            .context("Failed to reach media host")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Media host delete failed with status {}",
                response.status()
            );
        }

        Ok(())
    }
}

/// Upload response from the media host
#[derive(Debug, Deserialize)]
struct RemoteUpload {
    #[serde(default)]
    secure_url: String,
    #[serde(default)]
    public_id: String,
}

/// True when the filename carries an allowed image extension.
pub fn is_allowed_image(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Strip a client-supplied filename down to a safe basename.
///
/// Path components are dropped, anything outside `[A-Za-z0-9_.-]` becomes
/// an underscore, and leading or trailing underscores and dots are
/// trimmed. Falls back to `image` when nothing survives.
fn sanitize_filename(filename: &str) -> Result<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let pattern =
        regex::Regex::new(r"[^A-Za-z0-9_.-]+").context("Failed to compile filename pattern")?;
    let cleaned = pattern.replace_all(base, "_");
    let trimmed = cleaned.trim_matches(|c: char| c == '_' || c == '.');

    if trimmed.is_empty() {
        Ok("image".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Split a filename into base and extension, dot included.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}


// ============================================================================
// Property-based tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Sanitized names are never empty and never escape the upload
        /// directory: no separators, no control characters, nothing outside
        /// the safe set.
        #[test]
        fn property_sanitized_names_are_safe(raw in "\\PC{0,40}") {
            let name = sanitize_filename(&raw).unwrap();
            prop_assert!(!name.is_empty());
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'));
            prop_assert!(!name.starts_with('.'));
        }

        /// The extension allow-list ignores case.
        #[test]
        fn property_extension_check_ignores_case(
            base in "[a-z]{1,8}",
            ext in prop_oneof![Just("png"), Just("jpg"), Just("jpeg"), Just("webp")],
            upper in any::<bool>(),
        ) {
            let ext = if upper { ext.to_uppercase() } else { ext.to_string() };
            let filename = format!("{}.{}", base, ext);
            prop_assert!(is_allowed_image(&filename));
        }

        /// Anything outside the allow-list never passes.
        #[test]
        fn property_foreign_extensions_rejected(
            base in "[a-z]{1,8}",
            ext in "[a-z]{1,4}",
        ) {
            prop_assume!(!ALLOWED_EXTENSIONS.contains(&ext.as_str()));
            let filename = format!("{}.{}", base, ext);
            prop_assert!(!is_allowed_image(&filename));
        }
    }
}

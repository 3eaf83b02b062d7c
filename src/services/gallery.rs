//! Photo albums and moderation.
//!
//! Album creation, photo upload through the media service, the one-way
//! approval workflow and photo deletion. Approval is advisory metadata:
//! members see everything, moderators see which entries still need a
//! pass. Role checks happen at the HTTP layer; this service enforces the
//! submission rules (consent acknowledgement, mandatory title, allowed
//! file formats).

use crate::db::repositories::{AlbumRepository, PhotoRepository};
use crate::models::{Album, Photo};
use crate::services::media::{MediaService, MediaServiceError};
use anyhow::Context;
use std::sync::Arc;

/// Error types for gallery operations
#[derive(Debug, thiserror::Error)]
pub enum GalleryServiceError {
    /// Invalid input; the message is shown to the user as-is
    #[error("{0}")]
    ValidationError(String),

    /// Referenced album or photo does not exist
    #[error("{0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaServiceError> for GalleryServiceError {
    fn from(e: MediaServiceError) -> Self {
        match e {
            MediaServiceError::ValidationError(msg) => GalleryServiceError::ValidationError(msg),
            MediaServiceError::InternalError(e) => GalleryServiceError::InternalError(e),
        }
    }
}

/// Gallery service for albums, photos and the approval workflow
pub struct GalleryService {
    album_repo: Arc<dyn AlbumRepository>,
    photo_repo: Arc<dyn PhotoRepository>,
    media: Arc<MediaService>,
}

impl GalleryService {
    /// Create a new gallery service
    pub fn new(
        album_repo: Arc<dyn AlbumRepository>,
        photo_repo: Arc<dyn PhotoRepository>,
        media: Arc<MediaService>,
    ) -> Self {
        Self {
            album_repo,
            photo_repo,
            media,
        }
    }

    /// Create an album. New albums start unapproved.
    ///
    /// The submission must acknowledge image-rights consent and carry a
    /// title; the description is optional.
    pub async fn create_album(
        &self,
        input: NewAlbumInput,
    ) -> Result<Album, GalleryServiceError> {
        if input.consent != "yes" {
            return Err(GalleryServiceError::ValidationError(
                "Merci de confirmer le respect du droit à l’image.".to_string(),
            ));
        }

        let title = input.title.trim();
        if title.is_empty() {
            return Err(GalleryServiceError::ValidationError(
                "Titre obligatoire.".to_string(),
            ));
        }

        let album = Album::new(title.to_string(), input.description.trim().to_string());
        let created = self
            .album_repo
            .create(&album)
            .await
            .context("Failed to create album")?;

        Ok(created)
    }

    /// Albums, newest first.
    pub async fn list_albums(&self) -> Result<Vec<Album>, GalleryServiceError> {
        let albums = self
            .album_repo
            .list()
            .await
            .context("Failed to list albums")?;

        Ok(albums)
    }

    /// A single album.
    pub async fn album(&self, album_id: i64) -> Result<Album, GalleryServiceError> {
        self.get_album(album_id).await
    }

    /// An album together with its photos, newest photo first.
    pub async fn album_with_photos(
        &self,
        album_id: i64,
    ) -> Result<(Album, Vec<Photo>), GalleryServiceError> {
        let album = self.get_album(album_id).await?;
        let photos = self
            .photo_repo
            .list_by_album(album_id)
            .await
            .context("Failed to list photos")?;

        Ok((album, photos))
    }

    /// Add a photo to an album. New photos start unapproved.
    ///
    /// The album must exist and the submission must acknowledge
    /// image-rights consent; the file goes through the media service
    /// (format allow-list, placement). A photo may be added to an album
    /// that is itself still unapproved.
    pub async fn add_photo(
        &self,
        album_id: i64,
        input: NewPhotoInput,
    ) -> Result<Photo, GalleryServiceError> {
        let album = self.get_album(album_id).await?;

        if input.consent != "yes" {
            return Err(GalleryServiceError::ValidationError(
                "Merci de confirmer le respect du droit à l’image.".to_string(),
            ));
        }

        let placed = self
            .media
            .place(input.file_data, &input.file_name, "albums")
            .await?;

        let photo = Photo::new(
            album.id,
            placed.url,
            input.caption.trim().to_string(),
            placed.delete_token,
        );
        let created = self
            .photo_repo
            .create(&photo)
            .await
            .context("Failed to create photo")?;

        Ok(created)
    }

    /// Approve an album. One-way and idempotent.
    pub async fn approve_album(&self, album_id: i64) -> Result<(), GalleryServiceError> {
        self.get_album(album_id).await?;

        self.album_repo
            .set_approved(album_id, true)
            .await
            .context("Failed to approve album")?;

        Ok(())
    }

    /// Approve a photo. One-way and idempotent.
    ///
    /// Returns the photo so callers can redirect to its album.
    pub async fn approve_photo(&self, photo_id: i64) -> Result<Photo, GalleryServiceError> {
        let photo = self.get_photo(photo_id).await?;

        self.photo_repo
            .set_approved(photo_id, true)
            .await
            .context("Failed to approve photo")?;

        Ok(photo)
    }

    /// Delete a photo in any approval state.
    ///
    /// The backing image is removed best-effort first; the record always
    /// goes. Returns the deleted photo so callers can redirect to its
    /// album.
    pub async fn delete_photo(&self, photo_id: i64) -> Result<Photo, GalleryServiceError> {
        let photo = self.get_photo(photo_id).await?;

        self.media.delete(&photo.file_path, &photo.delete_token).await;

        self.photo_repo
            .delete(photo_id)
            .await
            .context("Failed to delete photo")?;

        Ok(photo)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn get_album(&self, album_id: i64) -> Result<Album, GalleryServiceError> {
        self.album_repo
            .get_by_id(album_id)
            .await
            .context("Failed to get album")?
            .ok_or_else(|| GalleryServiceError::NotFound("Album introuvable.".to_string()))
    }

    async fn get_photo(&self, photo_id: i64) -> Result<Photo, GalleryServiceError> {
        self.photo_repo
            .get_by_id(photo_id)
            .await
            .context("Failed to get photo")?
            .ok_or_else(|| GalleryServiceError::NotFound("Photo introuvable.".to_string()))
    }
}

/// Input for album creation
#[derive(Debug, Clone)]
pub struct NewAlbumInput {
    pub title: String,
    pub description: String,
    /// Image-rights acknowledgement; the form sends `yes` when ticked
    pub consent: String,
}

impl NewAlbumInput {
    /// Create a new album input
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        consent: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            consent: consent.into(),
        }
    }
}

/// Input for a photo upload
#[derive(Debug, Clone)]
pub struct NewPhotoInput {
    pub file_name: String,
    pub file_data: Vec<u8>,
    pub caption: String,
    /// Image-rights acknowledgement; the form sends `yes` when ticked
    pub consent: String,
}

impl NewPhotoInput {
    /// Create a new photo input
    pub fn new(
        file_name: impl Into<String>,
        file_data: Vec<u8>,
        caption: impl Into<String>,
        consent: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_data,
            caption: caption.into(),
            consent: consent.into(),
        }
    }
}

//! News posts.
//!
//! Publication and deletion of the association's news feed. Publishing is
//! open to staff and admins, deletion to admins only; those gates live at
//! the HTTP layer. An optional illustration goes through the media service
//! under the `actus` subfolder.

use crate::db::repositories::NewsRepository;
use crate::models::NewsPost;
use crate::services::media::{MediaService, MediaServiceError};
use anyhow::Context;
use std::sync::Arc;

/// Error types for news operations
#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    /// Invalid input; the message is shown to the user as-is
    #[error("{0}")]
    ValidationError(String),

    /// Referenced post does not exist
    #[error("{0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<MediaServiceError> for NewsServiceError {
    fn from(e: MediaServiceError) -> Self {
        match e {
            MediaServiceError::ValidationError(msg) => NewsServiceError::ValidationError(msg),
            MediaServiceError::InternalError(e) => NewsServiceError::InternalError(e),
        }
    }
}

/// News service for the public feed
pub struct NewsService {
    news_repo: Arc<dyn NewsRepository>,
    media: Arc<MediaService>,
}

impl NewsService {
    /// Create a new news service
    pub fn new(news_repo: Arc<dyn NewsRepository>, media: Arc<MediaService>) -> Self {
        Self { news_repo, media }
    }

    /// Publish a post. Title and body are both mandatory; the illustration
    /// is optional and rejected outright when its format is not allowed.
    pub async fn publish(&self, input: NewPostInput) -> Result<NewsPost, NewsServiceError> {
        let title = input.title.trim();
        let content = input.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(NewsServiceError::ValidationError(
                "Titre + contenu obligatoires.".to_string(),
            ));
        }

        let (image_path, delete_token) = if input.image_name.trim().is_empty() {
            (String::new(), String::new())
        } else {
            let placed = self
                .media
                .place(input.image_data, &input.image_name, "actus")
                .await?;
            (placed.url, placed.delete_token)
        };

        let post = NewsPost::new(
            title.to_string(),
            content.to_string(),
            image_path,
            delete_token,
        );
        let created = self
            .news_repo
            .create(&post)
            .await
            .context("Failed to create news post")?;

        Ok(created)
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<NewsPost>, NewsServiceError> {
        let posts = self
            .news_repo
            .list()
            .await
            .context("Failed to list news posts")?;

        Ok(posts)
    }

    /// The N most recent posts, for the home page.
    pub async fn latest(&self, limit: i64) -> Result<Vec<NewsPost>, NewsServiceError> {
        let posts = self
            .news_repo
            .latest(limit)
            .await
            .context("Failed to list news posts")?;

        Ok(posts)
    }

    /// Delete a post, removing its illustration best-effort first.
    pub async fn delete(&self, post_id: i64) -> Result<(), NewsServiceError> {
        let post = self
            .news_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get news post")?
            .ok_or_else(|| NewsServiceError::NotFound("Actu introuvable.".to_string()))?;

        if post.has_image() {
            self.media.delete(&post.image_path, &post.delete_token).await;
        }

        self.news_repo
            .delete(post_id)
            .await
            .context("Failed to delete news post")?;

        Ok(())
    }
}

/// Input for publishing a news post
#[derive(Debug, Clone)]
pub struct NewPostInput {
    pub title: String,
    pub content: String,
    /// Illustration file name; empty when no image was attached
    pub image_name: String,
    pub image_data: Vec<u8>,
}

impl NewPostInput {
    /// Create an input without an illustration
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image_name: String::new(),
            image_data: Vec::new(),
        }
    }

    /// Attach an illustration
    pub fn with_image(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.image_name = name.into();
        self.image_data = data;
        self
    }
}

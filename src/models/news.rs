//! News post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// News post published by staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsPost {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// Post body (plain text)
    pub content: String,
    /// Optional illustration ("" when none)
    pub image_path: String,
    /// Opaque token used for best-effort remote deletion of the illustration
    pub delete_token: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl NewsPost {
    /// Create a new news post
    pub fn new(title: String, content: String, image_path: String, delete_token: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            title,
            content,
            image_path,
            delete_token,
            created_at: Utc::now(),
        }
    }

    /// Whether the post carries an illustration
    pub fn has_image(&self) -> bool {
        !self.image_path.is_empty()
    }
}

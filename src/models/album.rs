//! Album model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Photo album created by staff.
///
/// Albums start unapproved; approval is a one-way transition performed by a
/// moderator and is advisory metadata, not a visibility filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    /// Unique identifier
    pub id: i64,
    /// Album title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Whether a moderator has approved the album
    pub approved: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Album {
    /// Create a new unapproved album
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            title,
            description,
            approved: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_album_starts_unapproved() {
        let album = Album::new("Camp 2024".to_string(), "Photos du camp".to_string());
        assert_eq!(album.id, 0);
        assert!(!album.approved);
    }
}

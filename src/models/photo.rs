//! Photo model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Photo attached to an album.
///
/// `file_path` is either a root-relative local path or a remote HTTPS URL;
/// `delete_token` is the media host's opaque identifier, empty for local
/// files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    /// Unique identifier
    pub id: i64,
    /// Owning album
    pub album_id: i64,
    /// Storage location of the image
    pub file_path: String,
    /// Optional caption
    pub caption: String,
    /// Whether a moderator has approved the photo
    pub approved: bool,
    /// Opaque token used for best-effort remote deletion
    pub delete_token: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// Create a new unapproved photo
    pub fn new(album_id: i64, file_path: String, caption: String, delete_token: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            album_id,
            file_path,
            caption,
            approved: false,
            delete_token,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_photo_starts_unapproved() {
        let photo = Photo::new(3, "/static/uploads/cat.png".to_string(), String::new(), String::new());
        assert_eq!(photo.album_id, 3);
        assert!(!photo.approved);
        assert!(photo.delete_token.is_empty());
    }
}

//! Contact message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message left through the public contact form.
///
/// Append-only; read by admins, never deleted in-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    /// Unique identifier
    pub id: i64,
    /// Sender name
    pub name: String,
    /// Sender email address
    pub email: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub message: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Create a new contact message
    pub fn new(name: String, email: String, subject: String, message: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            subject,
            message,
            created_at: Utc::now(),
        }
    }
}

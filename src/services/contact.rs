//! Contact form.
//!
//! Public message intake and the admin-facing inbox. A stored message
//! optionally triggers an email notification; notification failures are
//! logged and never surfaced to the submitter.

use crate::db::repositories::ContactRepository;
use crate::models::ContactMessage;
use crate::services::email::EmailService;
use anyhow::Context;
use std::sync::Arc;

/// Error types for contact operations
#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    /// Invalid input; the message is shown to the user as-is
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Contact service for the public form and the admin inbox
pub struct ContactService {
    contact_repo: Arc<dyn ContactRepository>,
    email: Arc<EmailService>,
}

impl ContactService {
    /// Create a new contact service
    pub fn new(contact_repo: Arc<dyn ContactRepository>, email: Arc<EmailService>) -> Self {
        Self {
            contact_repo,
            email,
        }
    }

    /// Store a message from the public form.
    ///
    /// All four fields are mandatory after trimming. The sender address is
    /// stored as given; no format check beyond non-emptiness.
    pub async fn submit(
        &self,
        input: ContactInput,
    ) -> Result<ContactMessage, ContactServiceError> {
        let name = input.name.trim();
        let email = input.email.trim();
        let subject = input.subject.trim();
        let message = input.message.trim();

        if name.is_empty() || email.is_empty() || subject.is_empty() || message.is_empty() {
            return Err(ContactServiceError::ValidationError(
                "Merci de remplir tous les champs.".to_string(),
            ));
        }

        let record = ContactMessage::new(
            name.to_string(),
            email.to_string(),
            subject.to_string(),
            message.to_string(),
        );
        let created = self
            .contact_repo
            .create(&record)
            .await
            .context("Failed to store contact message")?;

        // Best-effort notification; the message is already stored.
        if self.email.is_configured() {
            if let Err(e) = self.email.send_contact_notification(&created).await {
                tracing::warn!(error = %e, "Contact notification failed");
            }
        }

        Ok(created)
    }

    /// All messages, newest first.
    pub async fn list(&self) -> Result<Vec<ContactMessage>, ContactServiceError> {
        let messages = self
            .contact_repo
            .list()
            .await
            .context("Failed to list contact messages")?;

        Ok(messages)
    }
}

/// Input from the public contact form
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactInput {
    /// Create a new contact input
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }
}

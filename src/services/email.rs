//! Outbound email notifications

use crate::config::EmailConfig;
use crate::models::ContactMessage;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Email service for sending notifications
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if notifications can be sent
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Notify the configured recipient about a new contact message
    pub async fn send_contact_notification(&self, message: &ContactMessage) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("SMTP notifications are not configured"));
        }

        let subject = format!("[Contact] {}", message.subject);
        let body = format!(
            "Nouveau message reçu via le formulaire de contact.\n\n\
             Nom : {}\n\
             Email : {}\n\n\
             {}\n",
            message.name, message.email, message.message
        );

        let mut builder = Message::builder()
            .from(
                self.config
                    .smtp_from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(self
                .config
                .contact_to
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        // The sender address comes from the form unvalidated; attach it as
        // reply-to only when it actually parses.
        if let Ok(reply_to) = message.email.parse() {
            builder = builder.reply_to(reply_to);
        }

        let email = builder
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if !self.config.smtp_user.is_empty() {
            transport = transport.credentials(Credentials::new(
                self.config.smtp_user.clone(),
                self.config.smtp_pass.clone(),
            ));
        }
        let mailer: AsyncSmtpTransport<Tokio1Executor> = transport.build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

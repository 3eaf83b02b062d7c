//! Contact message repository
//!
//! Database operations for contact-form messages. Messages are append-only;
//! the trait exposes only creation and listing.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::ContactMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Data access for contact messages.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a new message
    async fn create(&self, message: &ContactMessage) -> Result<ContactMessage>;

    /// List all messages, newest first
    async fn list(&self) -> Result<Vec<ContactMessage>>;
}

/// SQLx implementation of [`ContactRepository`] for both supported drivers.
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    /// New repository over the given pool.
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Boxed form, ready to hand to the services.
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, message: &ContactMessage) -> Result<ContactMessage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_message_sqlite(self.pool.as_sqlite().unwrap(), message).await
            }
            DatabaseDriver::Mysql => {
                create_message_mysql(self.pool.as_mysql().unwrap(), message).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<ContactMessage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_messages_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_messages_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_message_sqlite(
    pool: &SqlitePool,
    message: &ContactMessage,
) -> Result<ContactMessage> {
    let result = sqlx::query(
        r#"
        INSERT INTO contact_messages (name, email, subject, message, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.subject)
    .bind(&message.message)
    .bind(message.created_at)
    .execute(pool)
    .await
    .context("Failed to create contact message")?;

    let id = result.last_insert_rowid();

    Ok(ContactMessage {
        id,
        name: message.name.clone(),
        email: message.email.clone(),
        subject: message.subject.clone(),
        message: message.message.clone(),
        created_at: message.created_at,
    })
}

async fn list_messages_sqlite(pool: &SqlitePool) -> Result<Vec<ContactMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, email, subject, message, created_at
        FROM contact_messages
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list contact messages")?;

    Ok(rows.iter().map(row_to_message_sqlite).collect())
}

fn row_to_message_sqlite(row: &sqlx::sqlite::SqliteRow) -> ContactMessage {
    ContactMessage {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        subject: row.get("subject"),
        message: row.get("message"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_message_mysql(
    pool: &MySqlPool,
    message: &ContactMessage,
) -> Result<ContactMessage> {
    let result = sqlx::query(
        r#"
        INSERT INTO contact_messages (name, email, subject, message, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.subject)
    .bind(&message.message)
    .bind(message.created_at)
    .execute(pool)
    .await
    .context("Failed to create contact message")?;

    let id = result.last_insert_id() as i64;

    Ok(ContactMessage {
        id,
        name: message.name.clone(),
        email: message.email.clone(),
        subject: message.subject.clone(),
        message: message.message.clone(),
        created_at: message.created_at,
    })
}

async fn list_messages_mysql(pool: &MySqlPool) -> Result<Vec<ContactMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, email, subject, message, created_at
        FROM contact_messages
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list contact messages")?;

    Ok(rows.iter().map(row_to_message_mysql).collect())
}

fn row_to_message_mysql(row: &sqlx::mysql::MySqlRow) -> ContactMessage {
    ContactMessage {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        subject: row.get("subject"),
        message: row.get("message"),
        created_at: row.get("created_at"),
    }
}

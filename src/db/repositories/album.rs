//! Album repository
//!
//! Photo albums and their approval flag. `AlbumRepository` is the trait,
//! `SqlxAlbumRepository` the SQLite/MySQL implementation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Album;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Data access for albums.
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Create a new album
    async fn create(&self, album: &Album) -> Result<Album>;

    /// Get album by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Album>>;

    /// List all albums, newest first
    async fn list(&self) -> Result<Vec<Album>>;

    /// Set the approved flag
    async fn set_approved(&self, id: i64, approved: bool) -> Result<()>;
}

/// SQLx implementation of [`AlbumRepository`] for both supported drivers.
pub struct SqlxAlbumRepository {
    pool: DynDatabasePool,
}

impl SqlxAlbumRepository {
    /// New repository over the given pool.
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Boxed form, ready to hand to the services.
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AlbumRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AlbumRepository for SqlxAlbumRepository {
    async fn create(&self, album: &Album) -> Result<Album> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_album_sqlite(self.pool.as_sqlite().unwrap(), album).await
            }
            DatabaseDriver::Mysql => create_album_mysql(self.pool.as_mysql().unwrap(), album).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Album>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_album_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_album_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Album>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_albums_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_albums_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_album_approved_sqlite(self.pool.as_sqlite().unwrap(), id, approved).await
            }
            DatabaseDriver::Mysql => {
                set_album_approved_mysql(self.pool.as_mysql().unwrap(), id, approved).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_album_sqlite(pool: &SqlitePool, album: &Album) -> Result<Album> {
    let result = sqlx::query(
        r#"
        INSERT INTO albums (title, description, approved, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&album.title)
    .bind(&album.description)
    .bind(album.approved)
    .bind(album.created_at)
    .execute(pool)
    .await
    .context("Failed to create album")?;

    let id = result.last_insert_rowid();

    Ok(Album {
        id,
        title: album.title.clone(),
        description: album.description.clone(),
        approved: album.approved,
        created_at: album.created_at,
    })
}

async fn get_album_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Album>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, description, approved, created_at
        FROM albums
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get album by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_album_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_albums_sqlite(pool: &SqlitePool) -> Result<Vec<Album>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, description, approved, created_at
        FROM albums
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list albums")?;

    Ok(rows.iter().map(row_to_album_sqlite).collect())
}

async fn set_album_approved_sqlite(pool: &SqlitePool, id: i64, approved: bool) -> Result<()> {
    sqlx::query("UPDATE albums SET approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set album approval")?;

    Ok(())
}

fn row_to_album_sqlite(row: &sqlx::sqlite::SqliteRow) -> Album {
    Album {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        approved: row.get("approved"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_album_mysql(pool: &MySqlPool, album: &Album) -> Result<Album> {
    let result = sqlx::query(
        r#"
        INSERT INTO albums (title, description, approved, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&album.title)
    .bind(&album.description)
    .bind(album.approved)
    .bind(album.created_at)
    .execute(pool)
    .await
    .context("Failed to create album")?;

    let id = result.last_insert_id() as i64;

    Ok(Album {
        id,
        title: album.title.clone(),
        description: album.description.clone(),
        approved: album.approved,
        created_at: album.created_at,
    })
}

async fn get_album_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Album>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, description, approved, created_at
        FROM albums
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get album by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_album_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_albums_mysql(pool: &MySqlPool) -> Result<Vec<Album>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, description, approved, created_at
        FROM albums
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list albums")?;

    Ok(rows.iter().map(row_to_album_mysql).collect())
}

async fn set_album_approved_mysql(pool: &MySqlPool, id: i64, approved: bool) -> Result<()> {
    sqlx::query("UPDATE albums SET approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set album approval")?;

    Ok(())
}

fn row_to_album_mysql(row: &sqlx::mysql::MySqlRow) -> Album {
    Album {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        approved: row.get("approved"),
        created_at: row.get("created_at"),
    }
}

//! Photo repository
//!
//! Photos inside albums, each carrying its own approval flag.
//! `PhotoRepository` is the trait, `SqlxPhotoRepository` the
//! SQLite/MySQL implementation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Photo;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Data access for photos.
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// Create a new photo
    async fn create(&self, photo: &Photo) -> Result<Photo>;

    /// Get photo by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Photo>>;

    /// List photos of an album, newest first
    async fn list_by_album(&self, album_id: i64) -> Result<Vec<Photo>>;

    /// Set the approved flag
    async fn set_approved(&self, id: i64, approved: bool) -> Result<()>;

    /// Delete a photo record
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx implementation of [`PhotoRepository`] for both supported drivers.
pub struct SqlxPhotoRepository {
    pool: DynDatabasePool,
}

impl SqlxPhotoRepository {
    /// New repository over the given pool.
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Boxed form, ready to hand to the services.
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PhotoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PhotoRepository for SqlxPhotoRepository {
    async fn create(&self, photo: &Photo) -> Result<Photo> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_photo_sqlite(self.pool.as_sqlite().unwrap(), photo).await
            }
            DatabaseDriver::Mysql => create_photo_mysql(self.pool.as_mysql().unwrap(), photo).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Photo>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_photo_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_photo_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_album(&self, album_id: i64) -> Result<Vec<Photo>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_photos_by_album_sqlite(self.pool.as_sqlite().unwrap(), album_id).await
            }
            DatabaseDriver::Mysql => {
                list_photos_by_album_mysql(self.pool.as_mysql().unwrap(), album_id).await
            }
        }
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_photo_approved_sqlite(self.pool.as_sqlite().unwrap(), id, approved).await
            }
            DatabaseDriver::Mysql => {
                set_photo_approved_mysql(self.pool.as_mysql().unwrap(), id, approved).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_photo_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_photo_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_photo_sqlite(pool: &SqlitePool, photo: &Photo) -> Result<Photo> {
    let result = sqlx::query(
        r#"
        INSERT INTO photos (album_id, file_path, caption, approved, delete_token, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(photo.album_id)
    .bind(&photo.file_path)
    .bind(&photo.caption)
    .bind(photo.approved)
    .bind(&photo.delete_token)
    .bind(photo.created_at)
    .execute(pool)
    .await
    .context("Failed to create photo")?;

    let id = result.last_insert_rowid();

    Ok(Photo {
        id,
        album_id: photo.album_id,
        file_path: photo.file_path.clone(),
        caption: photo.caption.clone(),
        approved: photo.approved,
        delete_token: photo.delete_token.clone(),
        created_at: photo.created_at,
    })
}

async fn get_photo_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Photo>> {
    let row = sqlx::query(
        r#"
        SELECT id, album_id, file_path, caption, approved, delete_token, created_at
        FROM photos
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get photo by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_photo_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_photos_by_album_sqlite(pool: &SqlitePool, album_id: i64) -> Result<Vec<Photo>> {
    let rows = sqlx::query(
        r#"
        SELECT id, album_id, file_path, caption, approved, delete_token, created_at
        FROM photos
        WHERE album_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(album_id)
    .fetch_all(pool)
    .await
    .context("Failed to list photos by album")?;

    Ok(rows.iter().map(row_to_photo_sqlite).collect())
}

async fn set_photo_approved_sqlite(pool: &SqlitePool, id: i64, approved: bool) -> Result<()> {
    sqlx::query("UPDATE photos SET approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set photo approval")?;

    Ok(())
}

async fn delete_photo_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM photos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete photo")?;

    Ok(())
}

fn row_to_photo_sqlite(row: &sqlx::sqlite::SqliteRow) -> Photo {
    Photo {
        id: row.get("id"),
        album_id: row.get("album_id"),
        file_path: row.get("file_path"),
        caption: row.get("caption"),
        approved: row.get("approved"),
        delete_token: row.get("delete_token"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_photo_mysql(pool: &MySqlPool, photo: &Photo) -> Result<Photo> {
    let result = sqlx::query(
        r#"
        INSERT INTO photos (album_id, file_path, caption, approved, delete_token, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(photo.album_id)
    .bind(&photo.file_path)
    .bind(&photo.caption)
    .bind(photo.approved)
    .bind(&photo.delete_token)
    .bind(photo.created_at)
    .execute(pool)
    .await
    .context("Failed to create photo")?;

    let id = result.last_insert_id() as i64;

    Ok(Photo {
        id,
        album_id: photo.album_id,
        file_path: photo.file_path.clone(),
        caption: photo.caption.clone(),
        approved: photo.approved,
        delete_token: photo.delete_token.clone(),
        created_at: photo.created_at,
    })
}

async fn get_photo_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Photo>> {
    let row = sqlx::query(
        r#"
        SELECT id, album_id, file_path, caption, approved, delete_token, created_at
        FROM photos
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get photo by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_photo_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_photos_by_album_mysql(pool: &MySqlPool, album_id: i64) -> Result<Vec<Photo>> {
    let rows = sqlx::query(
        r#"
        SELECT id, album_id, file_path, caption, approved, delete_token, created_at
        FROM photos
        WHERE album_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(album_id)
    .fetch_all(pool)
    .await
    .context("Failed to list photos by album")?;

    Ok(rows.iter().map(row_to_photo_mysql).collect())
}

async fn set_photo_approved_mysql(pool: &MySqlPool, id: i64, approved: bool) -> Result<()> {
    sqlx::query("UPDATE photos SET approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set photo approval")?;

    Ok(())
}

async fn delete_photo_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM photos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete photo")?;

    Ok(())
}

fn row_to_photo_mysql(row: &sqlx::mysql::MySqlRow) -> Photo {
    Photo {
        id: row.get("id"),
        album_id: row.get("album_id"),
        file_path: row.get("file_path"),
        caption: row.get("caption"),
        approved: row.get("approved"),
        delete_token: row.get("delete_token"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{AlbumRepository, SqlxAlbumRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Album;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPhotoRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let albums = SqlxAlbumRepository::new(pool.clone());
        let album = albums
            .create(&Album::new("Camp 2024".to_string(), String::new()))
            .await
            .expect("Failed to create album");

        let repo = SqlxPhotoRepository::new(pool.clone());
        (pool, repo, album.id)
    }

    fn make_photo(album_id: i64, file_path: &str) -> Photo {
        Photo::new(album_id, file_path.to_string(), String::new(), String::new())
    }

    #[tokio::test]
    async fn test_create_photo() {
        let (_pool, repo, album_id) = setup_test_repo().await;

        let created = repo
            .create(&make_photo(album_id, "/static/uploads/cat.png"))
            .await
            .expect("Failed to create photo");

        assert!(created.id > 0);
        assert_eq!(created.album_id, album_id);
        assert_eq!(created.file_path, "/static/uploads/cat.png");
        assert!(!created.approved);
    }

    #[tokio::test]
    async fn test_get_photo_by_id() {
        let (_pool, repo, album_id) = setup_test_repo().await;
        let created = repo
            .create(&make_photo(album_id, "/static/uploads/dog.jpg"))
            .await
            .expect("Failed to create photo");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get photo")
            .expect("Photo not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.file_path, "/static/uploads/dog.jpg");
    }

    #[tokio::test]
    async fn test_get_photo_by_id_not_found() {
        let (_pool, repo, _album_id) = setup_test_repo().await;

        let found = repo.get_by_id(999).await.expect("Failed to get photo");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_by_album_newest_first() {
        let (pool, repo, album_id) = setup_test_repo().await;

        let first = repo
            .create(&make_photo(album_id, "/static/uploads/a.png"))
            .await
            .expect("Failed to create photo");
        let second = repo
            .create(&make_photo(album_id, "/static/uploads/b.png"))
            .await
            .expect("Failed to create photo");

        // A photo in another album must not leak into the listing
        let albums = SqlxAlbumRepository::new(pool.clone());
        let other = albums
            .create(&Album::new("Autre".to_string(), String::new()))
            .await
            .expect("Failed to create album");
        repo.create(&make_photo(other.id, "/static/uploads/c.png"))
            .await
            .expect("Failed to create photo");

        let photos = repo
            .list_by_album(album_id)
            .await
            .expect("Failed to list photos");

        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, second.id);
        assert_eq!(photos[1].id, first.id);
    }

    #[tokio::test]
    async fn test_set_approved() {
        let (_pool, repo, album_id) = setup_test_repo().await;
        let created = repo
            .create(&make_photo(album_id, "/static/uploads/cat.png"))
            .await
            .expect("Failed to create photo");

        repo.set_approved(created.id, true)
            .await
            .expect("Failed to approve photo");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get photo")
            .expect("Photo not found");
        assert!(found.approved);
    }

    #[tokio::test]
    async fn test_delete_photo() {
        let (_pool, repo, album_id) = setup_test_repo().await;
        let created = repo
            .create(&make_photo(album_id, "/static/uploads/cat.png"))
            .await
            .expect("Failed to create photo");

        repo.delete(created.id).await.expect("Failed to delete photo");

        let found = repo.get_by_id(created.id).await.expect("Failed to get photo");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_photo_with_remote_location() {
        let (_pool, repo, album_id) = setup_test_repo().await;
        let photo = Photo::new(
            album_id,
            "https://media.example.net/amicale/albums/cat.png".to_string(),
            "Le chat du camp".to_string(),
            "amicale/albums/cat".to_string(),
        );

        let created = repo.create(&photo).await.expect("Failed to create photo");
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get photo")
            .expect("Photo not found");

        assert!(found.file_path.starts_with("https://"));
        assert_eq!(found.delete_token, "amicale/albums/cat");
        assert_eq!(found.caption, "Le chat du camp");
    }
}

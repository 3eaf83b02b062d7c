//! News repository
//!
//! Published news posts, newest first. `NewsRepository` is the trait,
//! `SqlxNewsRepository` the SQLite/MySQL implementation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::NewsPost;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Data access for news posts.
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &NewsPost) -> Result<NewsPost>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<NewsPost>>;

    /// List all posts, newest first
    async fn list(&self) -> Result<Vec<NewsPost>>;

    /// List the N most recent posts
    async fn latest(&self, limit: i64) -> Result<Vec<NewsPost>>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx implementation of [`NewsRepository`] for both supported drivers.
pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    /// New repository over the given pool.
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Boxed form, ready to hand to the services.
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, post: &NewsPost) -> Result<NewsPost> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<NewsPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.as_sqlite().unwrap(), None).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.as_mysql().unwrap(), None).await,
        }
    }

    async fn latest(&self, limit: i64) -> Result<Vec<NewsPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), Some(limit)).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), Some(limit)).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewsPost) -> Result<NewsPost> {
    let result = sqlx::query(
        r#"
        INSERT INTO news_posts (title, content, image_path, delete_token, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_path)
    .bind(&post.delete_token)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create news post")?;

    let id = result.last_insert_rowid();

    Ok(NewsPost {
        id,
        title: post.title.clone(),
        content: post.content.clone(),
        image_path: post.image_path.clone(),
        delete_token: post.delete_token.clone(),
        created_at: post.created_at,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<NewsPost>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, image_path, delete_token, created_at
        FROM news_posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get news post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<NewsPost>> {
    let rows = match limit {
        Some(limit) => {
            sqlx::query(
                r#"
                SELECT id, title, content, image_path, delete_token, created_at
                FROM news_posts
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, title, content, image_path, delete_token, created_at
                FROM news_posts
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list news posts")?;

    Ok(rows.iter().map(row_to_post_sqlite).collect())
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM news_posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete news post")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> NewsPost {
    NewsPost {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        image_path: row.get("image_path"),
        delete_token: row.get("delete_token"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewsPost) -> Result<NewsPost> {
    let result = sqlx::query(
        r#"
        INSERT INTO news_posts (title, content, image_path, delete_token, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_path)
    .bind(&post.delete_token)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create news post")?;

    let id = result.last_insert_id() as i64;

    Ok(NewsPost {
        id,
        title: post.title.clone(),
        content: post.content.clone(),
        image_path: post.image_path.clone(),
        delete_token: post.delete_token.clone(),
        created_at: post.created_at,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<NewsPost>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, image_path, delete_token, created_at
        FROM news_posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get news post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_posts_mysql(pool: &MySqlPool, limit: Option<i64>) -> Result<Vec<NewsPost>> {
    let rows = match limit {
        Some(limit) => {
            sqlx::query(
                r#"
                SELECT id, title, content, image_path, delete_token, created_at
                FROM news_posts
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, title, content, image_path, delete_token, created_at
                FROM news_posts
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list news posts")?;

    Ok(rows.iter().map(row_to_post_mysql).collect())
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM news_posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete news post")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> NewsPost {
    NewsPost {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        image_path: row.get("image_path"),
        delete_token: row.get("delete_token"),
        created_at: row.get("created_at"),
    }
}

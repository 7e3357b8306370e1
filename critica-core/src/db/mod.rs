//! PostgreSQL persistence.
//!
//! The schema is created idempotently at startup; the uniqueness and
//! range invariants live in the schema itself so that concurrent requests
//! cannot race past an application-level existence check:
//!
//! - `UNIQUE (username)`, `UNIQUE (email)` and the compound
//!   `UNIQUE (username, email)` on users
//! - `UNIQUE (author_id, title_id)` on reviews
//! - `CHECK (score BETWEEN 1 AND 10)` on reviews
//! - `ON DELETE SET NULL` for title → category (a category deletion never
//!   cascades to its titles), `ON DELETE CASCADE` everywhere a child
//!   cannot outlive its parent

pub mod catalog;
pub mod reviews;
pub mod users;

pub use catalog::CatalogRepo;
pub use reviews::ReviewsRepo;
pub use users::UsersRepo;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::{CoreError, Result};

/// Connection handle; cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    /// Build a page from raw query parameters, clamping the limit to
    /// `1..=MAX_LIMIT` and the offset to non-negative.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        let default = Self::default();
        Self {
            limit: limit.unwrap_or(default.limit).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(url)
            .await
            .map_err(|e| {
                CoreError::internal(format!("failed to connect to PostgreSQL: {e}"))
            })?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn users(&self) -> UsersRepo {
        UsersRepo::new(self.pool.clone())
    }

    pub fn catalog(&self) -> CatalogRepo {
        CatalogRepo::new(self.pool.clone())
    }

    pub fn reviews(&self) -> ReviewsRepo {
        ReviewsRepo::new(self.pool.clone())
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("initializing database schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                bio TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'user',
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_username_key UNIQUE (username),
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_username_email_key UNIQUE (username, email)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                CONSTRAINT categories_slug_key UNIQUE (slug)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS genres (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                CONSTRAINT genres_slug_key UNIQUE (slug)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS titles (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                year INTEGER NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS title_genres (
                title_id UUID NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                genre_id UUID NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                PRIMARY KEY (title_id, genre_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id UUID PRIMARY KEY,
                title_id UUID NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                score INTEGER NOT NULL,
                published_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT reviews_score_range CHECK (score >= 1 AND score <= 10),
                CONSTRAINT reviews_author_title_key UNIQUE (author_id, title_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id UUID PRIMARY KEY,
                review_id UUID NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
                author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                published_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_titles_category ON titles(category_id)",
            "CREATE INDEX IF NOT EXISTS idx_titles_year ON titles(year)",
            "CREATE INDEX IF NOT EXISTS idx_reviews_title ON reviews(title_id)",
            "CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review_id)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("database schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit_and_offset() {
        let page = Page::clamped(None, None);
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);

        let page = Page::clamped(Some(0), Some(-5));
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset, 0);

        let page = Page::clamped(Some(10_000), Some(40));
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.offset, 40);
    }
}

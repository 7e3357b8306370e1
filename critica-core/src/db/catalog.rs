//! Catalog repository: categories, genres and titles.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::Page;
use crate::catalog::{Category, Genre, Title, TitleFilter};
use crate::error::{CoreError, Result};

/// Scalar fields of a title row, joined with its category and the rating
/// aggregate. Genres are attached in a second query.
#[derive(Debug, sqlx::FromRow)]
struct TitleRow {
    id: Uuid,
    name: String,
    year: i32,
    description: String,
    rating: Option<f64>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct TitleGenreRow {
    title_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
}

/// The select list shared by every title read. The rating is recomputed
/// per read from the live review scores; `AVG` over zero rows is NULL, so
/// an unreviewed title has no rating rather than a zero one.
const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           (SELECT CAST(AVG(score) AS DOUBLE PRECISION)
              FROM reviews WHERE title_id = t.id) AS rating,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

/// Validated fields for a title insert.
#[derive(Debug, Clone)]
pub struct TitleInsert {
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category_id: Uuid,
    pub genre_ids: Vec<Uuid>,
}

/// Partial title update; `None` leaves the stored value untouched.
/// `genre_ids: Some(_)` replaces the whole genre set.
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub genre_ids: Option<Vec<Uuid>>,
}

#[derive(Clone, Debug)]
pub struct CatalogRepo {
    pool: PgPool,
}

impl CatalogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Categories

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        page: Page,
    ) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug FROM categories
            WHERE $1::text IS NULL OR name ILIKE '%' || $1 || '%'
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_category(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_slug_violation(e, "categories_slug_key"))?;

        info!("created category: {slug}");
        Ok(row)
    }

    /// Delete by slug. Titles referencing the category are kept; their
    /// category becomes NULL via the FK's SET NULL action.
    pub async fn delete_category(&self, slug: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted category: {slug}");
        }
        Ok(deleted)
    }

    // Genres

    pub async fn list_genres(
        &self,
        search: Option<&str>,
        page: Page,
    ) -> Result<Vec<Genre>> {
        let rows = sqlx::query_as::<_, Genre>(
            r#"
            SELECT id, name, slug FROM genres
            WHERE $1::text IS NULL OR name ILIKE '%' || $1 || '%'
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_genre(&self, slug: &str) -> Result<Option<Genre>> {
        let row = sqlx::query_as::<_, Genre>(
            "SELECT id, name, slug FROM genres WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_genre(&self, name: &str, slug: &str) -> Result<Genre> {
        let row = sqlx::query_as::<_, Genre>(
            r#"
            INSERT INTO genres (id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_slug_violation(e, "genres_slug_key"))?;

        info!("created genre: {slug}");
        Ok(row)
    }

    /// Delete by slug. Join rows cascade, detaching the genre from its
    /// titles without touching the titles themselves.
    pub async fn delete_genre(&self, slug: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM genres WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted genre: {slug}");
        }
        Ok(deleted)
    }

    // Titles

    pub async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: Page,
    ) -> Result<Vec<Title>> {
        let query = format!(
            r#"
            {TITLE_SELECT}
            WHERE ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM title_genres tg
                    JOIN genres g ON g.id = tg.genre_id
                    WHERE tg.title_id = t.id AND g.slug = $2))
              AND ($3::text IS NULL OR t.name ILIKE '%' || $3 || '%')
              AND ($4::int4 IS NULL OR t.year = $4)
            ORDER BY t.name
            LIMIT $5 OFFSET $6
            "#
        );
        let rows: Vec<TitleRow> = sqlx::query_as(&query)
            .bind(filter.category.as_deref())
            .bind(filter.genre.as_deref())
            .bind(filter.name.as_deref())
            .bind(filter.year)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        self.attach_genres(rows).await
    }

    pub async fn get_title(&self, id: Uuid) -> Result<Option<Title>> {
        let query = format!("{TITLE_SELECT} WHERE t.id = $1");
        let row: Option<TitleRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_genres(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn create_title(&self, insert: TitleInsert) -> Result<Title> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO titles (id, name, year, description, category_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&insert.name)
        .bind(insert.year)
        .bind(&insert.description)
        .bind(insert.category_id)
        .execute(&mut *tx)
        .await?;

        for genre_id in &insert.genre_ids {
            sqlx::query(
                "INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("created title: {} ({id})", insert.name);

        self.get_title(id)
            .await?
            .ok_or_else(|| CoreError::internal("title vanished after insert"))
    }

    pub async fn update_title(
        &self,
        id: Uuid,
        changes: TitleChanges,
    ) -> Result<Option<Title>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE titles SET
                name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.year)
        .bind(changes.description.as_deref())
        .bind(changes.category_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(genre_ids) = &changes.genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for genre_id in genre_ids {
                sqlx::query(
                    "INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)",
                )
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!("updated title: {id}");
        self.get_title(id).await
    }

    pub async fn delete_title(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted title: {id}");
        }
        Ok(deleted)
    }

    /// Resolve the genre lists for a batch of title rows in one query.
    async fn attach_genres(&self, rows: Vec<TitleRow>) -> Result<Vec<Title>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut by_title: HashMap<Uuid, Vec<Genre>> = HashMap::new();

        if !ids.is_empty() {
            let genre_rows: Vec<TitleGenreRow> = sqlx::query_as(
                r#"
                SELECT tg.title_id, g.id, g.name, g.slug
                FROM title_genres tg
                JOIN genres g ON g.id = tg.genre_id
                WHERE tg.title_id = ANY($1)
                ORDER BY g.name
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for row in genre_rows {
                by_title.entry(row.title_id).or_default().push(Genre {
                    id: row.id,
                    name: row.name,
                    slug: row.slug,
                });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let category = match (row.category_id, row.category_name, row.category_slug)
                {
                    (Some(id), Some(name), Some(slug)) => {
                        Some(Category { id, name, slug })
                    }
                    _ => None,
                };
                Title {
                    id: row.id,
                    name: row.name,
                    year: row.year,
                    description: row.description,
                    rating: row.rating,
                    category,
                    genre: by_title.remove(&row.id).unwrap_or_default(),
                }
            })
            .collect())
    }
}

fn map_slug_violation(err: sqlx::Error, constraint: &str) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.constraint() == Some(constraint) {
            return CoreError::validation("slug already in use");
        }
    }
    CoreError::Database(err)
}

//! Reviews and comments repository.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::Page;
use crate::error::{CoreError, Result};
use crate::review::{Comment, Review, SCORE_RANGE_MESSAGE};
use crate::user::User;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.text, u.username AS author, r.author_id,
           r.score, r.published_at, r.title_id
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.text, u.username AS author, c.author_id, c.published_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[derive(Clone, Debug)]
pub struct ReviewsRepo {
    pool: PgPool,
}

impl ReviewsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Reviews

    pub async fn list_reviews(&self, title_id: Uuid, page: Page) -> Result<Vec<Review>> {
        let query = format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 \
             ORDER BY r.published_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Review>(&query)
            .bind(title_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_review(
        &self,
        title_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>> {
        let query = format!("{REVIEW_SELECT} WHERE r.title_id = $1 AND r.id = $2");
        let row = sqlx::query_as::<_, Review>(&query)
            .bind(title_id)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Insert a review. The one-review-per-(author, title) rule is the
    /// database's compound unique constraint, so two concurrent submissions
    /// cannot both land.
    pub async fn create_review(
        &self,
        title_id: Uuid,
        author: &User,
        text: &str,
        score: i32,
    ) -> Result<Review> {
        #[derive(sqlx::FromRow)]
        struct Inserted {
            id: Uuid,
            published_at: chrono::DateTime<chrono::Utc>,
        }

        let inserted: Inserted = sqlx::query_as(
            r#"
            INSERT INTO reviews (id, title_id, author_id, text, score)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, published_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title_id)
        .bind(author.id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await
        .map_err(map_review_violation)?;

        info!(
            "created review: {} on title {title_id} by {}",
            inserted.id, author.username
        );

        Ok(Review {
            id: inserted.id,
            text: text.to_string(),
            author: author.username.clone(),
            author_id: author.id,
            score,
            published_at: inserted.published_at,
            title_id,
        })
    }

    pub async fn update_review(
        &self,
        review_id: Uuid,
        text: Option<&str>,
        score: Option<i32>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reviews SET
                text = COALESCE($2, text),
                score = COALESCE($3, score)
            WHERE id = $1
            "#,
        )
        .bind(review_id)
        .bind(text)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(map_review_violation)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_review(&self, review_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted review: {review_id}");
        }
        Ok(deleted)
    }

    // Comments

    pub async fn list_comments(
        &self,
        review_id: Uuid,
        page: Page,
    ) -> Result<Vec<Comment>> {
        let query = format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 \
             ORDER BY c.published_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Comment>(&query)
            .bind(review_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_comment(
        &self,
        review_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>> {
        let query = format!("{COMMENT_SELECT} WHERE c.review_id = $1 AND c.id = $2");
        let row = sqlx::query_as::<_, Comment>(&query)
            .bind(review_id)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create_comment(
        &self,
        review_id: Uuid,
        author: &User,
        text: &str,
    ) -> Result<Comment> {
        #[derive(sqlx::FromRow)]
        struct Inserted {
            id: Uuid,
            published_at: chrono::DateTime<chrono::Utc>,
        }

        let inserted: Inserted = sqlx::query_as(
            r#"
            INSERT INTO comments (id, review_id, author_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, published_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(author.id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "created comment: {} on review {review_id} by {}",
            inserted.id, author.username
        );

        Ok(Comment {
            id: inserted.id,
            text: text.to_string(),
            author: author.username.clone(),
            author_id: author.id,
            published_at: inserted.published_at,
        })
    }

    pub async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(comment_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted comment: {comment_id}");
        }
        Ok(deleted)
    }
}

fn map_review_violation(err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.constraint() {
            Some("reviews_author_title_key") => {
                return CoreError::validation("you have already reviewed this title");
            }
            Some("reviews_score_range") => {
                return CoreError::validation(SCORE_RANGE_MESSAGE);
            }
            _ => {}
        }
    }
    CoreError::Database(err)
}

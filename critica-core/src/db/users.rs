//! Users repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::Page;
use crate::error::{CoreError, Result};
use crate::role::Role;
use crate::user::{NewUser, User, UserPatch};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, \
                            role, is_superuser, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    bio: String,
    role: String,
    is_superuser: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role).map_err(|_| {
            CoreError::internal(format!(
                "corrupt role value {:?} for user {}",
                row.role, row.username
            ))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            role,
            is_superuser: row.is_superuser,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct UsersRepo {
    pool: PgPool,
}

impl UsersRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Uniqueness collisions — on username, email, or
    /// the compound pair — surface as validation failures, matching the
    /// API contract for duplicates.
    pub async fn create(&self, new: NewUser) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.bio)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_unique_violation)?;

        let user = User::try_from(row)?;
        info!("created user: {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    /// Exact match on both fields; this is the duplicate-signup probe.
    pub async fn find_by_username_and_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND email = $2"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Apply a validated partial update. `role` arrives pre-parsed so the
    /// closed enumeration is already enforced. Bumps `updated_at`, which
    /// invalidates any outstanding confirmation codes for the user.
    pub async fn update(
        &self,
        username: &str,
        patch: &UserPatch,
        role: Option<Role>,
    ) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                bio = COALESCE($6, bio),
                role = COALESCE($7, role),
                updated_at = NOW()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(patch.username.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.bio.as_deref())
        .bind(role.map(Role::as_str))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_user_unique_violation)?;

        match row {
            Some(row) => {
                let user = User::try_from(row)?;
                info!("updated user: {} ({})", user.username, user.id);
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("deleted user: {username}");
        }
        Ok(deleted)
    }
}

fn map_user_unique_violation(err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.constraint() {
            Some("users_username_key") => {
                return CoreError::validation("username already in use");
            }
            Some("users_email_key") => {
                return CoreError::validation("email already in use");
            }
            Some("users_username_email_key") => {
                return CoreError::validation("user already exists");
            }
            _ => {}
        }
    }
    CoreError::Database(err)
}

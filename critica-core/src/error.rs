use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or constraint-violating input. Carries every violation
    /// found, so callers can report them together.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    /// Signup hit an existing (username, email) pair. The confirmation code
    /// has still been redispatched by the time this is returned.
    #[error("user already registered")]
    AlreadyRegistered,

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Single-message validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use critica_core::CoreError;
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            messages: vec![message.into()],
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Validation failure carrying every violation found.
    pub fn validation(messages: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            messages,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "messages": self.messages,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(messages) => Self::validation(messages),
            CoreError::AlreadyRegistered => Self::bad_request(err.to_string()),
            CoreError::NotFound(what) => Self::not_found(what),
            CoreError::Unauthorized(msg) => Self::unauthorized(msg),
            CoreError::Forbidden(msg) => Self::forbidden(msg),
            CoreError::Database(e) => Self::internal(format!("database error: {e}")),
            CoreError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (CoreError::AlreadyRegistered, StatusCode::BAD_REQUEST),
            (CoreError::not_found("x"), StatusCode::NOT_FOUND),
            (
                CoreError::Unauthorized("no".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                CoreError::Forbidden("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                CoreError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn validation_keeps_every_message() {
        let err = AppError::from(CoreError::Validation(vec![
            "first".to_string(),
            "second".to_string(),
        ]));
        assert_eq!(err.messages.len(), 2);
    }
}

//! Reviews and comments.
//!
//! A user may post at most one review per title — enforced by a compound
//! uniqueness constraint in the database, not only here — and unlimited
//! comments per review. Both are owned by their author for authorization
//! purposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

pub const SCORE_MIN: i32 = 1;
pub const SCORE_MAX: i32 = 10;
pub const SCORE_RANGE_MESSAGE: &str = "score must be between 1 and 10";

/// A scored review of a title.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub text: String,
    /// Author's username.
    pub author: String,
    #[serde(skip)]
    pub author_id: Uuid,
    pub score: i32,
    pub published_at: DateTime<Utc>,
    pub title_id: Uuid,
}

/// A comment on a review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    /// Author's username.
    pub author: String,
    #[serde(skip)]
    pub author_id: Uuid,
    pub published_at: DateTime<Utc>,
}

/// Review create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    pub text: Option<String>,
    pub score: Option<i32>,
}

pub fn validate_score(score: i32) -> std::result::Result<(), String> {
    if (SCORE_MIN..=SCORE_MAX).contains(&score) {
        Ok(())
    } else {
        Err(SCORE_RANGE_MESSAGE.to_string())
    }
}

impl ReviewPayload {
    /// Validate a create payload: text and score are both required.
    pub fn validate_create(&self) -> Result<(&str, i32)> {
        let mut errors = Vec::new();

        let text = self.text.as_deref().unwrap_or_default();
        if text.is_empty() {
            errors.push("text must not be empty".to_string());
        }

        match self.score {
            None => errors.push("score is required".to_string()),
            Some(score) => {
                if let Err(msg) = validate_score(score) {
                    errors.push(msg);
                }
            }
        }

        if errors.is_empty() {
            Ok((text, self.score.unwrap_or(SCORE_MIN)))
        } else {
            Err(CoreError::Validation(errors))
        }
    }

    /// Validate a partial update: only the provided fields are checked.
    pub fn validate_update(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.text.as_deref().is_some_and(str::is_empty) {
            errors.push("text must not be empty".to_string());
        }
        if let Some(score) = self.score {
            if let Err(msg) = validate_score(score) {
                errors.push(msg);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors))
        }
    }
}

/// Comment create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    pub text: Option<String>,
}

impl CommentPayload {
    pub fn validate(&self) -> Result<&str> {
        match self.text.as_deref() {
            None | Some("") => Err(CoreError::validation("text must not be empty")),
            Some(text) => Ok(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_boundaries() {
        assert!(validate_score(SCORE_MIN).is_ok());
        assert!(validate_score(SCORE_MAX).is_ok());
        assert_eq!(validate_score(0).unwrap_err(), SCORE_RANGE_MESSAGE);
        assert_eq!(validate_score(11).unwrap_err(), SCORE_RANGE_MESSAGE);
        assert!(validate_score(-3).is_err());
    }

    #[test]
    fn review_create_requires_text_and_score() {
        let payload = ReviewPayload {
            text: None,
            score: None,
        };
        match payload.validate_create() {
            Err(CoreError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other:?}"),
        }

        let payload = ReviewPayload {
            text: Some("great".to_string()),
            score: Some(7),
        };
        assert_eq!(payload.validate_create().unwrap(), ("great", 7));
    }

    #[test]
    fn review_update_accepts_partial_payloads() {
        let payload = ReviewPayload {
            text: None,
            score: Some(10),
        };
        assert!(payload.validate_update().is_ok());

        let payload = ReviewPayload {
            text: None,
            score: Some(11),
        };
        assert!(payload.validate_update().is_err());
    }

    #[test]
    fn comment_requires_text() {
        assert!(CommentPayload { text: None }.validate().is_err());
        assert_eq!(
            CommentPayload {
                text: Some("nice".to_string())
            }
            .validate()
            .unwrap(),
            "nice"
        );
    }
}

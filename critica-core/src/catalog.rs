//! Catalog entities: categories, genres and titles.
//!
//! Titles are system-owned — there is no author relation, so mutation
//! authority comes solely from role (see
//! [`crate::access::AdminOrReadOnly`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern compiles"));

pub const CATEGORY_NAME_MAX_LEN: usize = 100;
pub const GENRE_NAME_MAX_LEN: usize = 50;
pub const TITLE_NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 200;
pub const SLUG_MAX_LEN: usize = 50;

/// Top-level classification. A title belongs to at most one category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    #[serde(skip)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Tag-like classification. A title may carry any number of genres.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    #[serde(skip)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// A reviewable work, with its derived rating and resolved relations.
///
/// `rating` is the arithmetic mean of all review scores, recomputed on
/// every read. It is absent — never zero — when the title has no reviews.
#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: Uuid,
    pub name: String,
    pub year: i32,
    pub description: String,
    pub rating: Option<f64>,
    pub category: Option<Category>,
    pub genre: Vec<Genre>,
}

/// Create/update payload for categories and genres.
#[derive(Debug, Clone, Deserialize)]
pub struct TermPayload {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl TermPayload {
    pub fn validate(self, name_max_len: usize) -> Result<(String, String)> {
        let mut errors = Vec::new();

        let name = self.name.unwrap_or_default();
        if name.is_empty() {
            errors.push("name must not be empty".to_string());
        } else if name.len() > name_max_len {
            errors.push(format!("name cannot exceed {name_max_len} characters"));
        }

        let slug = self.slug.unwrap_or_default();
        if let Err(msg) = validate_slug(&slug) {
            errors.push(msg);
        }

        if errors.is_empty() {
            Ok((name, slug))
        } else {
            Err(CoreError::Validation(errors))
        }
    }
}

pub fn validate_slug(slug: &str) -> std::result::Result<(), String> {
    if slug.is_empty() {
        return Err("slug must not be empty".to_string());
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err(format!("slug cannot exceed {SLUG_MAX_LEN} characters"));
    }
    if !SLUG_RE.is_match(slug) {
        return Err("slug may only contain letters, digits, hyphens and underscores".to_string());
    }
    Ok(())
}

/// Title create payload. Category and genres are referenced by slug, the
/// way the write surface of the API addresses them.
#[derive(Debug, Clone, Deserialize)]
pub struct TitlePayload {
    pub name: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub genre: Option<Vec<String>>,
}

impl TitlePayload {
    /// Validate a create payload: name, year and category are required.
    pub fn validate_create(&self) -> Result<()> {
        let mut errors = Vec::new();

        match self.name.as_deref() {
            None | Some("") => errors.push("name must not be empty".to_string()),
            Some(name) if name.len() > TITLE_NAME_MAX_LEN => {
                errors.push(format!("name cannot exceed {TITLE_NAME_MAX_LEN} characters"));
            }
            Some(_) => {}
        }

        match self.year {
            None => errors.push("year is required".to_string()),
            Some(year) if year < 0 => {
                errors.push("year must not be negative".to_string());
            }
            Some(_) => {}
        }

        if self
            .description
            .as_deref()
            .is_some_and(|d| d.len() > DESCRIPTION_MAX_LEN)
        {
            errors.push(format!(
                "description cannot exceed {DESCRIPTION_MAX_LEN} characters"
            ));
        }

        if self.category.as_deref().is_none_or(str::is_empty) {
            errors.push("category is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors))
        }
    }

    /// Validate a partial update: only the provided fields are checked.
    pub fn validate_update(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Some(name) = self.name.as_deref() {
            if name.is_empty() {
                errors.push("name must not be empty".to_string());
            } else if name.len() > TITLE_NAME_MAX_LEN {
                errors.push(format!("name cannot exceed {TITLE_NAME_MAX_LEN} characters"));
            }
        }
        if self.year.is_some_and(|y| y < 0) {
            errors.push("year must not be negative".to_string());
        }
        if self
            .description
            .as_deref()
            .is_some_and(|d| d.len() > DESCRIPTION_MAX_LEN)
        {
            errors.push(format!(
                "description cannot exceed {DESCRIPTION_MAX_LEN} characters"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors))
        }
    }
}

/// Optional list filters for titles.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    /// Category slug, exact match.
    pub category: Option<String>,
    /// Genre slug, exact match against any attached genre.
    pub genre: Option<String>,
    /// Case-insensitive name substring.
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_pattern() {
        assert!(validate_slug("sci-fi").is_ok());
        assert!(validate_slug("films_2024").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("no spaces").is_err());
        assert!(validate_slug("no/slash").is_err());
    }

    #[test]
    fn term_payload_reports_both_violations() {
        let payload = TermPayload {
            name: None,
            slug: Some("bad slug".to_string()),
        };
        match payload.validate(CATEGORY_NAME_MAX_LEN) {
            Err(CoreError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn title_create_requires_name_year_category() {
        let payload = TitlePayload {
            name: None,
            year: None,
            description: None,
            category: None,
            genre: None,
        };
        match payload.validate_create() {
            Err(CoreError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn title_update_checks_only_provided_fields() {
        let payload = TitlePayload {
            name: None,
            year: Some(-1),
            description: None,
            category: None,
            genre: None,
        };
        assert!(payload.validate_update().is_err());

        let payload = TitlePayload {
            name: None,
            year: None,
            description: None,
            category: None,
            genre: None,
        };
        assert!(payload.validate_update().is_ok());
    }
}

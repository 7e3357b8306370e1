//! Request handlers.
//!
//! Handlers are thin: they bind extractors to the core policies,
//! validators and repositories. Each endpoint group names exactly one
//! policy; detail handlers resolve the target first, then run the
//! object-level check against its owner.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod genres;
pub mod reviews;
pub mod titles;
pub mod users;

use axum::http::Method;
use critica_core::access::Verb;
use critica_core::db::Page;
use serde::Deserialize;

/// Shared limit/offset (and optional name search) query parameters for
/// list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::clamped(self.limit, self.offset)
    }
}

/// Map the wire method onto the permission layer's verb. Anything exotic
/// is treated as an unsafe write.
pub fn verb_of(method: &Method) -> Verb {
    if *method == Method::GET {
        Verb::Get
    } else if *method == Method::HEAD {
        Verb::Head
    } else if *method == Method::OPTIONS {
        Verb::Options
    } else if *method == Method::PUT {
        Verb::Put
    } else if *method == Method::PATCH {
        Verb::Patch
    } else if *method == Method::DELETE {
        Verb::Delete
    } else {
        Verb::Post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_match_methods() {
        assert_eq!(verb_of(&Method::GET), Verb::Get);
        assert_eq!(verb_of(&Method::PATCH), Verb::Patch);
        assert_eq!(verb_of(&Method::DELETE), Verb::Delete);
        assert!(verb_of(&Method::GET).is_safe());
        assert!(!verb_of(&Method::POST).is_safe());
    }
}

//! The three-tier role model.
//!
//! Roles are a closed enumeration rather than free-text comparison, so an
//! unrecognized role value cannot exist past the parse boundary: it is
//! rejected as a validation failure where the string enters the system
//! (request payloads, database rows).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Account role. Exactly one applies to each user; the capability checks
/// derived from it are mutually exclusive. The superuser flag on
/// [`crate::user::User`] is a separate, orthogonal elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Canonical lowercase form, as stored in the `users.role` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Parse a canonical role string. Comparison is case-sensitive exact
    /// match; anything else is a validation failure.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::validation(format!(
                "unknown role: {other:?} (expected one of: user, moderator, admin)"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_values() {
        assert_eq!(Role::parse("user").unwrap(), Role::User);
        assert_eq!(Role::parse("moderator").unwrap(), Role::Moderator);
        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
    }

    #[test]
    fn rejects_unknown_and_miscased_values() {
        assert!(Role::parse("Admin").is_err());
        assert!(Role::parse("ADMIN").is_err());
        assert!(Role::parse("owner").is_err());
        assert!(Role::parse("").is_err());
    }

    #[test]
    fn defaults_to_least_privileged() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn serde_round_trip_is_lowercase() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, "\"moderator\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Moderator);
    }
}

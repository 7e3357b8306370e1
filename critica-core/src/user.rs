//! User accounts and profile payloads.
//!
//! A user is created unconfirmed at signup and becomes an active session
//! holder once the emailed confirmation code is exchanged for an access
//! token (see [`crate::registration`]). The role field is mutable only
//! through the admin user-management surface; the self-service profile
//! endpoint freezes it for least-privileged accounts.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::role::Role;

/// Word characters plus `.`, `@`, `+`, `-`, matching the signup contract.
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"));

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const NAME_MAX_LEN: usize = 150;

/// Registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique username (word characters plus `.`, `@`, `+`, `-`).
    pub username: String,
    /// Unique email address; also part of the compound (username, email)
    /// uniqueness constraint.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Free-text bio.
    pub bio: String,
    pub role: Role,
    /// Orthogonal elevated capability; satisfies any admin-or-above check
    /// regardless of role.
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    /// Bumped on every profile mutation. Confirmation codes are bound to
    /// this value, so a state change invalidates outstanding codes.
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// The profile representation returned by the user-management and
/// self-service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            role: user.role,
        }
    }
}

pub fn validate_username(username: &str) -> std::result::Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    if username.len() > USERNAME_MAX_LEN {
        return Err(format!("username cannot exceed {USERNAME_MAX_LEN} characters"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "username may only contain letters, digits and . @ + - _".to_string()
        );
    }
    Ok(())
}

pub fn validate_email(email: &str) -> std::result::Result<(), String> {
    if email.is_empty() {
        return Err("email must not be empty".to_string());
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(format!("email cannot exceed {EMAIL_MAX_LEN} characters"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("email is not a valid address".to_string());
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("email is not a valid address".to_string());
    }
    Ok(())
}

/// Admin user-creation payload. Fields mirror the profile representation;
/// role defaults to `user` when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl CreateUser {
    /// Validate and normalize into insertable fields. All violations are
    /// collected and reported together.
    pub fn validate(self) -> Result<NewUser> {
        let mut errors = Vec::new();

        let username = self.username.unwrap_or_default();
        if let Err(msg) = validate_username(&username) {
            errors.push(msg);
        }

        let email = self.email.unwrap_or_default();
        if let Err(msg) = validate_email(&email) {
            errors.push(msg);
        }

        for (field, value) in [
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
        ] {
            if value.is_some_and(|v| v.len() > NAME_MAX_LEN) {
                errors.push(format!("{field} cannot exceed {NAME_MAX_LEN} characters"));
            }
        }

        let role = match self.role.as_deref() {
            None => Role::User,
            Some(value) => match Role::parse(value) {
                Ok(role) => role,
                Err(CoreError::Validation(mut msgs)) => {
                    errors.append(&mut msgs);
                    Role::User
                }
                Err(other) => return Err(other),
            },
        };

        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }

        Ok(NewUser {
            username,
            email,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            role,
        })
    }
}

/// Validated fields for a user insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    /// Role as submitted; parsed during validation so an unknown value is
    /// a reportable failure rather than a deserialization rejection.
    pub role: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.role.is_none()
    }

    /// Validate the provided fields, returning the parsed role (if any).
    pub fn validate(&self) -> Result<Option<Role>> {
        let mut errors = Vec::new();

        if let Some(username) = self.username.as_deref() {
            if let Err(msg) = validate_username(username) {
                errors.push(msg);
            }
        }
        if let Some(email) = self.email.as_deref() {
            if let Err(msg) = validate_email(email) {
                errors.push(msg);
            }
        }
        for (field, value) in [
            ("first_name", self.first_name.as_deref()),
            ("last_name", self.last_name.as_deref()),
        ] {
            if value.is_some_and(|v| v.len() > NAME_MAX_LEN) {
                errors.push(format!("{field} cannot exceed {NAME_MAX_LEN} characters"));
            }
        }

        let role = match self.role.as_deref() {
            None => None,
            Some(value) => match Role::parse(value) {
                Ok(role) => Some(role),
                Err(CoreError::Validation(mut msgs)) => {
                    errors.append(&mut msgs);
                    None
                }
                Err(other) => return Err(other),
            },
        };

        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }
        Ok(role)
    }

    /// Screen a self-service patch against the requester's own role.
    ///
    /// When the requester holds the least-privileged role and the patch
    /// touches `role`, the entire patch is dropped — including any other
    /// fields submitted alongside it — and the caller must return the
    /// stored profile unchanged. Moderators and admins may patch their own
    /// role through this surface.
    pub fn screened_for(self, requester_role: Role) -> Option<UserPatch> {
        if requester_role == Role::User && self.role.is_some() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_pattern() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b@c+d-e_f").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"x".repeat(USERNAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@nodot").is_err());
    }

    #[test]
    fn create_collects_all_violations() {
        let payload = CreateUser {
            username: Some("bad name".to_string()),
            email: Some("not-an-email".to_string()),
            first_name: None,
            last_name: None,
            bio: None,
            role: Some("owner".to_string()),
        };
        match payload.validate() {
            Err(CoreError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn create_defaults_role_to_user() {
        let payload = CreateUser {
            username: Some("alice".to_string()),
            email: Some("alice@example.com".to_string()),
            first_name: None,
            last_name: None,
            bio: None,
            role: None,
        };
        assert_eq!(payload.validate().unwrap().role, Role::User);
    }

    #[test]
    fn patch_rejects_unknown_role() {
        let patch = UserPatch {
            role: Some("root".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn self_patch_with_role_is_dropped_for_user_role() {
        let patch = UserPatch {
            bio: Some("new bio".to_string()),
            role: Some("admin".to_string()),
            ..Default::default()
        };
        // The innocent bio change is dropped along with the role change.
        assert!(patch.screened_for(Role::User).is_none());
    }

    #[test]
    fn self_patch_without_role_passes_for_user_role() {
        let patch = UserPatch {
            bio: Some("new bio".to_string()),
            ..Default::default()
        };
        assert!(patch.screened_for(Role::User).is_some());
    }

    #[test]
    fn self_patch_with_role_passes_for_moderator_and_admin() {
        for role in [Role::Moderator, Role::Admin] {
            let patch = UserPatch {
                role: Some("admin".to_string()),
                ..Default::default()
            };
            assert!(patch.screened_for(role).is_some());
        }
    }
}

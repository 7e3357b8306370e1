//! Signup and token issuance.
//!
//! Each identity moves through two states: unconfirmed (created, code
//! dispatched) and confirmed (code exchanged for an access token). A
//! signup that matches an existing (username, email) pair redispatches
//! the code and still reports "already registered" — the side effect is
//! intentional and must not be deduplicated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::Database;
use crate::error::{CoreError, Result};
use crate::mail::{MailSettings, Mailer};
use crate::tokens::{AccessTokens, ConfirmationCodes};
use crate::user::{self, NewUser, User};
use crate::role::Role;

/// Username reserved for the self-service profile route.
const RESERVED_USERNAME: &str = "me";

/// Signup payload. Fields are optional so that missing values surface as
/// validation failures alongside the content checks.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub username: Option<String>,
}

impl SignupRequest {
    /// Validate before any side effect. All violations are collected and
    /// reported together.
    pub fn validate(&self) -> Result<(String, String)> {
        let mut errors = Vec::new();

        let username = self.username.clone().unwrap_or_default();
        if let Err(msg) = user::validate_username(&username) {
            errors.push(msg);
        }
        let email = self.email.clone().unwrap_or_default();
        if let Err(msg) = user::validate_email(&email) {
            errors.push(msg);
        }

        if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
            errors.push(format!("username {RESERVED_USERNAME:?} is reserved"));
        }
        if !username.is_empty() && username.eq_ignore_ascii_case(&email) {
            errors.push("username must not equal the email address".to_string());
        }

        if errors.is_empty() {
            Ok((username, email))
        } else {
            Err(CoreError::Validation(errors))
        }
    }
}

/// Echo of the accepted signup payload.
#[derive(Debug, Clone, Serialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

/// Token-exchange payload. A missing username fails validation before any
/// lookup is attempted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub confirmation_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// The signup / token-issuance flow.
pub struct RegistrationService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    codes: ConfirmationCodes,
    tokens: Arc<AccessTokens>,
    mail: MailSettings,
}

impl RegistrationService {
    pub fn new(
        db: Database,
        mailer: Arc<dyn Mailer>,
        codes: ConfirmationCodes,
        tokens: Arc<AccessTokens>,
        mail: MailSettings,
    ) -> Self {
        Self {
            db,
            mailer,
            codes,
            tokens,
            mail,
        }
    }

    /// Register a new identity, or redispatch the code to an existing one.
    ///
    /// The duplicate branch dispatches the confirmation code and then
    /// fails with [`CoreError::AlreadyRegistered`]; the caller's error
    /// response does not undo the dispatch.
    pub async fn sign_up(&self, request: SignupRequest) -> Result<SignupResponse> {
        let (username, email) = request.validate()?;

        if let Some(existing) = self
            .db
            .users()
            .find_by_username_and_email(&username, &email)
            .await?
        {
            self.dispatch_code(&existing);
            return Err(CoreError::AlreadyRegistered);
        }

        // A collision on only one of the two fields is left to the
        // database uniqueness constraints, which close the race between
        // concurrent signups.
        let user = self
            .db
            .users()
            .create(NewUser {
                username,
                email,
                first_name: String::new(),
                last_name: String::new(),
                bio: String::new(),
                role: Role::User,
            })
            .await?;

        self.dispatch_code(&user);

        Ok(SignupResponse {
            email: user.email,
            username: user.username,
        })
    }

    /// Exchange a confirmation code for a signed access token.
    pub async fn obtain_token(&self, request: TokenRequest) -> Result<TokenResponse> {
        let username = match request.username.as_deref() {
            None | Some("") => {
                return Err(CoreError::validation("username is required"));
            }
            Some(username) => username,
        };

        let user = self
            .db
            .users()
            .find_by_username(username)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("user {username:?}")))?;

        let code = request.confirmation_code.as_deref().unwrap_or_default();
        if !self.codes.verify(&user, code) {
            return Err(CoreError::validation("invalid confirmation code"));
        }

        let token = self.tokens.issue(user.id)?;
        Ok(TokenResponse { token })
    }

    /// Fire-and-forget code dispatch. Transport latency or failure never
    /// reaches the signup caller.
    fn dispatch_code(&self, user: &User) {
        let code = self.codes.code_for(user);
        let mailer = Arc::clone(&self.mailer);
        let to = user.email.clone();
        let subject = self.mail.confirmation_subject.clone();
        let username = user.username.clone();

        tokio::spawn(async move {
            let body = format!("Hello {username},\n\nYour confirmation code: {code}\n");
            if let Err(err) = mailer.send(&to, &subject, &body).await {
                warn!(%to, %err, "confirmation mail dispatch failed");
            }
        });
    }
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str) -> SignupRequest {
        SignupRequest {
            email: Some(email.to_string()),
            username: Some(username.to_string()),
        }
    }

    #[test]
    fn accepts_ordinary_signup() {
        let (username, email) =
            request("alice", "alice@example.com").validate().unwrap();
        assert_eq!(username, "alice");
        assert_eq!(email, "alice@example.com");
    }

    #[test]
    fn rejects_reserved_username_case_insensitively() {
        for name in ["me", "Me", "ME"] {
            let err = request(name, "someone@example.com").validate().unwrap_err();
            match err {
                CoreError::Validation(errors) => {
                    assert!(errors.iter().any(|e| e.contains("reserved")), "{errors:?}");
                }
                other => panic!("expected validation failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_username_equal_to_email() {
        let err = request("Alice@example.com", "alice@example.com")
            .validate()
            .unwrap_err();
        match err {
            CoreError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("email")), "{errors:?}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn reports_joint_violations_together() {
        // "me" is reserved AND equals the email, so both messages appear
        // in a single failure.
        let err = request("me", "me").validate().unwrap_err();
        match err {
            CoreError::Validation(errors) => {
                assert!(errors.len() >= 2, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("reserved")));
                assert!(errors.iter().any(|e| e.contains("must not equal")));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_fail_validation() {
        let err = SignupRequest {
            email: None,
            username: None,
        }
        .validate()
        .unwrap_err();
        match err {
            CoreError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}

use std::sync::Arc;

use critica_core::db::Database;
use critica_core::mail::{MailSettings, Mailer, TracingMailer};
use critica_core::registration::RegistrationService;
use critica_core::tokens::{AccessTokens, ConfirmationCodes};

use super::config::Config;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub tokens: Arc<AccessTokens>,
    pub registration: Arc<RegistrationService>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let tokens = Arc::new(AccessTokens::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl_secs,
        ));
        let codes = ConfirmationCodes::new(config.confirmation_secret.as_bytes().to_vec());
        let mail = MailSettings {
            sender: config.mail_sender.clone(),
            ..MailSettings::default()
        };
        let mailer: Arc<dyn Mailer> = Arc::new(TracingMailer::new(mail.sender.clone()));

        let registration = Arc::new(RegistrationService::new(
            db.clone(),
            mailer,
            codes,
            Arc::clone(&tokens),
            mail,
        ));

        Self {
            db,
            config: Arc::new(config),
            tokens,
            registration,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

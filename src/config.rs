use std::env;

use crate::models::NOTIFICATION_BATCH;

/// Engine configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Long-lived secret the session signing key is derived from.
    pub session_secret: String,
    /// Domain used in the From line of outbound delivery mails.
    pub mail_domain: String,
    /// Cap on notification entries per read.
    pub notification_batch: usize,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let session_secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
            log::warn!("SESSION_SECRET not set, using default (not secure for production!)");
            "default_session_secret_change_me".to_string()
        });

        let mail_domain = env::var("MAIL_DOMAIN").unwrap_or_else(|_| "example.com".to_string());

        let notification_batch = env::var("NOTIFICATION_BATCH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(NOTIFICATION_BATCH);

        Self {
            session_secret,
            mail_domain,
            notification_batch,
        }
    }
}

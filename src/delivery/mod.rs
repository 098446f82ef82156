//! Outbound email side channel.
//!
//! Delivery is strictly best-effort: the engine logs failures and moves on,
//! and a failed delivery never fails the operation that triggered it.

use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery error: {0}")]
    Failed(String),
}

pub trait Mailer: Send + Sync {
    fn deliver(&self, mail: &Email) -> Result<(), DeliveryError>;
}

/// Discards everything. The default when no real mail channel is wired in.
pub struct NoopMailer;

impl Mailer for NoopMailer {
    fn deliver(&self, _mail: &Email) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Captures deliveries in memory so tests can observe the side channel.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for MemoryMailer {
    fn deliver(&self, mail: &Email) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// Always fails. Lets tests prove delivery trouble never surfaces.
pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn deliver(&self, _mail: &Email) -> Result<(), DeliveryError> {
        Err(DeliveryError::Failed("mail gateway unreachable".to_string()))
    }
}

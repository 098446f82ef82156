use thiserror::Error;

use crate::store::StoreError;

/// Caller-visible failure taxonomy.
///
/// Every variant is recoverable at the request boundary and carries a
/// human-readable reason. Tampered session tokens are not represented here:
/// they verify to `None` and are logged, the same as an absent token.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required field.
    #[error("{0}")]
    Validation(String),
    /// Actor targets itself where that is forbidden.
    #[error("{0}")]
    SelfReference(String),
    /// Referenced entity absent, or in an ambiguous state.
    #[error("{0}")]
    NotFound(String),
    /// No resolvable session identity and no explicit override id.
    #[error("Session required")]
    Authentication,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;

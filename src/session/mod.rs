//! Stateless session identity codec.
//!
//! The caller's identity travels in a client-held bearer token: the user id
//! plus an HMAC-SHA256 authentication code over it. Nothing is stored
//! server-side. The process-wide signing key is derived once from a
//! long-lived secret and is read-only afterwards.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::Uid;

type HmacSha256 = Hmac<Sha256>;

/// Instruction for the transport layer: how to update the client-held
/// token. The concrete wire encoding (cookie attributes, headers) is the
/// transport's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDirective {
    /// Install this token value. Tokens carry no expiry.
    Set(String),
    /// Remove the token irrecoverably.
    Clear,
}

impl SessionDirective {
    pub fn token(&self) -> Option<&str> {
        match self {
            SessionDirective::Set(token) => Some(token),
            SessionDirective::Clear => None,
        }
    }
}

pub struct SessionCodec {
    key: [u8; 32],
}

impl SessionCodec {
    /// Derive the signing key as a fixed-size digest of the passphrase.
    pub fn new(passphrase: &str) -> Self {
        Self {
            key: Sha256::digest(passphrase.as_bytes()).into(),
        }
    }

    /// Bind `id` to an authentication code and hand the transport a token
    /// to install.
    pub fn issue(&self, id: &Uid) -> SessionDirective {
        let mut mac = self.mac();
        mac.update(id.as_str().as_bytes());
        let code = hex::encode(mac.finalize().into_bytes());
        SessionDirective::Set(format!("{}.{}", id, code))
    }

    /// Recover the user id from a token.
    ///
    /// Returns `None` when the token is absent, malformed, or fails
    /// authentication. A code mismatch means tampering; it is logged and
    /// otherwise indistinguishable from an absent token.
    pub fn verify(&self, token: Option<&str>) -> Option<Uid> {
        let token = token?;
        let (raw_id, raw_code) = token.split_once('.')?;
        let id = Uid::parse(raw_id).ok()?;
        let code = hex::decode(raw_code).ok()?;
        let mut mac = self.mac();
        mac.update(id.as_str().as_bytes());
        // verify_slice compares in constant time
        match mac.verify_slice(&code) {
            Ok(()) => Some(id),
            Err(_) => {
                log::warn!("session token tampered");
                None
            }
        }
    }

    /// Instruct the transport to drop the client-held token.
    pub fn revoke(&self) -> SessionDirective {
        SessionDirective::Clear
    }

    /// Resolve the caller's identity, or fail where an identity is
    /// mandatory.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Uid> {
        self.verify(token).ok_or(Error::Authentication)
    }

    fn mac(&self) -> HmacSha256 {
        // 32-byte keys are always accepted
        HmacSha256::new_from_slice(&self.key).expect("HMAC key length")
    }
}

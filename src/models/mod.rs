use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;

/// Message previews in listings are truncated to this many characters.
pub const PREVIEW_LEN: usize = 70;

/// Hard cap on notification entries handed out per read.
pub const NOTIFICATION_BATCH: usize = 5;

/// Member directory page size.
pub const MEMBERS_PER_PAGE: usize = 20;

/// Opaque 32-hex identifier, used for users, messages and edges alike.
///
/// Input is case-insensitive; the stored form is always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Uid(String);

impl Uid {
    /// Validate and normalize a raw identifier.
    ///
    /// Anything failing `^[0-9a-fA-F]{32}$` is rejected here, before any
    /// store access happens.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.len() == 32 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Uid(raw.to_ascii_lowercase()))
        } else {
            Err(Error::Validation(format!("Invalid ID: {}", raw)))
        }
    }

    /// Mint a fresh identifier. Only stores create ids.
    pub(crate) fn mint() -> Self {
        Uid(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identifier a store minted itself and is handing back.
    pub(crate) fn unchecked(raw: String) -> Self {
        Uid(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public view of a member. Password material is stripped at the store
/// boundary and never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub is_editor: bool,
}

/// One message as it appears in inbox/outbox/conversation listings, with
/// the content truncated to [`PREVIEW_LEN`] characters.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub from: String,
    pub to: String,
    pub message: String,
    pub is_read: bool,
    pub timestamp: i64,
}

/// A single message fetched directly, with untruncated content.
#[derive(Debug, Clone, Serialize)]
pub struct MessageDetail {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    pub is_read: bool,
    pub sent_time: i64,
}

/// A notification entry as delivered to the client.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub username: String,
    pub avatar: String,
    pub label: String,
}

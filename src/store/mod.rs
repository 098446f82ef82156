//! Graph store capability interface.
//!
//! The engine owns no persistent state of its own: every node and edge
//! lives in an external graph store reached through [`GraphStore`]. A
//! reference SQLite-backed implementation lives in [`sqlite`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Profile, Uid};

pub mod sqlite;

pub use sqlite::SqliteGraph;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Free-form attributes carried by nodes and edges.
pub type AttrMap = HashMap<String, Value>;

/// Edge types this engine traffics in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Follow,
    Message,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "follow",
            EdgeKind::Message => "message",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "follow" => Some(EdgeKind::Follow),
            "message" => Some(EdgeKind::Message),
            _ => None,
        }
    }
}

/// A node as the store hands it back, resolved to its entity kind at the
/// store boundary so callers never inspect types at runtime.
#[derive(Debug, Clone)]
pub enum Node {
    User(UserNode),
    /// A node of some kind this engine does not operate on.
    Other { id: Uid, kind: String },
}

impl Node {
    pub fn id(&self) -> &Uid {
        match self {
            Node::User(user) => &user.id,
            Node::Other { id, .. } => id,
        }
    }

    pub fn as_user(&self) -> Option<&UserNode> {
        match self {
            Node::User(user) => Some(user),
            Node::Other { .. } => None,
        }
    }
}

/// A user node with its well-known attributes.
#[derive(Debug, Clone, Serialize)]
pub struct UserNode {
    pub id: Uid,
    pub username: String,
    pub email: String,
    pub avatar: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_editor: bool,
}

impl UserNode {
    /// The shareable face of this user: everything except the password hash.
    pub fn profile(&self) -> Profile {
        Profile {
            username: self.username.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            is_editor: self.is_editor,
        }
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: Uid,
    pub kind: EdgeKind,
    pub tail: Uid,
    pub head: Uid,
    pub attrs: AttrMap,
}

impl Edge {
    pub fn content(&self) -> Option<&str> {
        self.attrs.get("content").and_then(Value::as_str)
    }

    pub fn sent_time(&self) -> Option<i64> {
        self.attrs.get("sent_time").and_then(Value::as_i64)
    }

    pub fn is_read(&self) -> bool {
        self.attrs
            .get("is_read")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// One entry in a user's notification queue, referencing the edge that
/// caused it.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: Uid,
    pub edge_id: Uid,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// The capability contract the engine requires of a graph store.
///
/// Any call here is a potential blocking point; the engine treats store
/// latency transparently and performs no retries of its own.
pub trait GraphStore: Send + Sync {
    fn node(&self, id: &Uid) -> StoreResult<Node>;
    fn edge(&self, id: &Uid) -> StoreResult<Edge>;
    fn create_node(&self, kind: &str, attrs: AttrMap) -> StoreResult<Node>;
    fn create_edge(&self, kind: EdgeKind, tail: &Uid, head: &Uid, attrs: AttrMap)
        -> StoreResult<Edge>;
    fn destroy_edge(&self, id: &Uid) -> StoreResult<()>;
    /// Edges of `kind` pointing at `node`.
    fn edges_in(&self, node: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>>;
    /// Edges of `kind` leaving `node`.
    fn edges_out(&self, node: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>>;
    /// Directed edges of `kind` from `tail` to `head`.
    fn edges_from_to(&self, tail: &Uid, head: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>>;
    fn set_edge_attr(&self, id: &Uid, key: &str, value: Value) -> StoreResult<()>;
    /// Bulk read-state update: flip `is_read` on every message edge between
    /// the two nodes, in either direction, and return the affected edges
    /// with their updated attributes.
    fn mark_conversation_read(&self, a: &Uid, b: &Uid) -> StoreResult<Vec<Edge>>;
    /// All user nodes, in registration order.
    fn members(&self) -> StoreResult<Vec<Node>>;
    /// The earliest-registered user, always treated as an editor.
    fn founder(&self) -> StoreResult<Uid>;
    fn enqueue_notification(&self, user: &Uid, edge: &Uid, label: &str) -> StoreResult<()>;
    /// Pending notifications for `user` in chronological order, at most
    /// `max` of them. Does not advance the cursor.
    fn unread_notifications(&self, user: &Uid, max: usize) -> StoreResult<Vec<NotificationRecord>>;
    /// Advance the cursor past the given entries so they are never
    /// redelivered.
    fn consume_notifications(&self, ids: &[String]) -> StoreResult<()>;
}

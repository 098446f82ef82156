//! Private messaging: message edges, read state, conversation views.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::delivery::{Email, Mailer};
use crate::error::{Error, Result};
use crate::models::{MessageDetail, MessageView, Uid, PREVIEW_LEN};
use crate::store::{AttrMap, Edge, EdgeKind, GraphStore, Node, StoreError, UserNode};

/// Who is sending: a known member, or an anonymous visitor with a display
/// name supplied by the caller.
#[derive(Debug, Clone)]
pub enum Sender {
    Known(Uid),
    Anonymous { name: String },
}

pub struct MessageService {
    store: Arc<dyn GraphStore>,
    mailer: Arc<dyn Mailer>,
    mail_domain: String,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        mailer: Arc<dyn Mailer>,
        mail_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            mail_domain: mail_domain.into(),
        }
    }

    /// Send a private message.
    ///
    /// Known senders get a message edge and its id back; anonymous sends
    /// only trigger the mail side channel. Either way a delivery mail goes
    /// out best-effort.
    pub fn send(&self, sender: Sender, to: &str, content: &str) -> Result<Option<Uid>> {
        let recipient_id =
            Uid::parse(to).map_err(|_| Error::Validation("Invalid recipient".to_string()))?;
        if content.is_empty() {
            return Err(Error::Validation("Message can't be empty".to_string()));
        }
        if let Sender::Known(id) = &sender {
            if *id == recipient_id {
                return Err(Error::SelfReference(
                    "Can't send a message to self".to_string(),
                ));
            }
        }
        let recipient = self.user(&recipient_id, "Recipient")?;

        let (message_id, from_line) = match &sender {
            Sender::Known(id) => {
                let sender_node = self.user(id, "Sender")?;
                let mut attrs = AttrMap::new();
                attrs.insert("content".to_string(), json!(content));
                attrs.insert("sent_time".to_string(), json!(Utc::now().timestamp_millis()));
                attrs.insert("is_read".to_string(), json!(false));
                let edge = self
                    .store
                    .create_edge(EdgeKind::Message, id, &recipient_id, attrs)?;
                let from = format!("{} <postmaster@{}>", sender_node.username, self.mail_domain);
                (Some(edge.id), from)
            }
            Sender::Anonymous { name } => (None, name.clone()),
        };

        // The message is already committed; mail trouble is not the
        // caller's problem.
        let body = match &message_id {
            Some(id) => format!("{}\n{}", content, id),
            None => content.to_string(),
        };
        let mail = Email {
            from: from_line,
            to: recipient.email.clone(),
            subject: "Private Message".to_string(),
            body,
        };
        if let Err(e) = self.mailer.deliver(&mail) {
            log::warn!("delivery mail to {} failed: {}", recipient.email, e);
        }

        Ok(message_id)
    }

    /// Flip the read flag, but only when `reader` is the recipient. Anyone
    /// else is a silent no-op. The flag never reverts.
    pub fn mark_read(&self, message_id: &str, reader: &Uid) -> Result<()> {
        let message_id = Uid::parse(message_id)
            .map_err(|_| Error::Validation("Invalid message ID".to_string()))?;
        let edge = self.message_edge(&message_id)?;
        if edge.head == *reader {
            self.store.set_edge_attr(&edge.id, "is_read", json!(true))?;
        }
        Ok(())
    }

    /// All incoming messages, previews only.
    pub fn inbox(&self, user: &Uid) -> Result<Vec<MessageView>> {
        let edges = self.store.edges_in(user, EdgeKind::Message)?;
        Ok(edges.iter().filter_map(view).collect())
    }

    /// All outgoing messages, previews only.
    pub fn outbox(&self, user: &Uid) -> Result<Vec<MessageView>> {
        let edges = self.store.edges_out(user, EdgeKind::Message)?;
        Ok(edges.iter().filter_map(view).collect())
    }

    /// Fetch one message in full. Only the sender and the recipient may
    /// see it; the recipient's fetch marks it read.
    pub fn fetch(&self, user: &Uid, message_id: &str) -> Result<MessageDetail> {
        let message_id = Uid::parse(message_id)
            .map_err(|_| Error::Validation("Invalid message ID".to_string()))?;
        let edge = self.message_edge(&message_id)?;
        if edge.tail != *user && edge.head != *user {
            return Err(Error::NotFound(
                "Message ID is not associated with the logged in user".to_string(),
            ));
        }
        let mut is_read = edge.is_read();
        if edge.head == *user && !is_read {
            self.store.set_edge_attr(&edge.id, "is_read", json!(true))?;
            is_read = true;
        }
        Ok(MessageDetail {
            id: edge.id.to_string(),
            from: edge.tail.to_string(),
            to: edge.head.to_string(),
            content: edge.content().unwrap_or_default().to_string(),
            is_read,
            sent_time: edge.sent_time().unwrap_or_default(),
        })
    }

    /// Incoming messages not yet read.
    pub fn unread_count(&self, user: &Uid) -> Result<usize> {
        let edges = self.store.edges_in(user, EdgeKind::Message)?;
        Ok(edges.iter().filter(|e| !e.is_read()).count())
    }

    /// Latest message per correspondent.
    ///
    /// The ascending timestamp sort is load-bearing: existing clients
    /// render the list in the order given. Ties keep the first edge seen.
    pub fn conversations(&self, user: &Uid) -> Result<Vec<MessageView>> {
        let sent = self.store.edges_out(user, EdgeKind::Message)?;
        let incoming = self.store.edges_in(user, EdgeKind::Message)?;
        let mut latest: HashMap<Uid, MessageView> = HashMap::new();
        for edge in sent.iter().chain(incoming.iter()) {
            let peer = if edge.tail == *user {
                edge.head.clone()
            } else {
                edge.tail.clone()
            };
            let Some(entry) = view(edge) else { continue };
            let newer = match latest.get(&peer) {
                // first-seen wins on equal timestamps
                Some(held) => entry.timestamp > held.timestamp,
                None => true,
            };
            if newer {
                latest.insert(peer, entry);
            }
        }
        let mut out: Vec<MessageView> = latest.into_values().collect();
        out.sort_by_key(|v| v.timestamp);
        Ok(out)
    }

    /// Full thread with one correspondent, newest first. Viewing the
    /// thread marks both directions read.
    pub fn conversation(&self, user: &Uid, with: &str) -> Result<Vec<MessageView>> {
        let with =
            Uid::parse(with).map_err(|_| Error::Validation("Invalid User ID".to_string()))?;
        let edges = self.store.mark_conversation_read(user, &with)?;
        let mut out: Vec<MessageView> = edges.iter().filter_map(view).collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    fn message_edge(&self, id: &Uid) -> Result<Edge> {
        match self.store.edge(id) {
            Ok(edge) if edge.kind == EdgeKind::Message => Ok(edge),
            Ok(_) => Err(Error::NotFound(format!("Message {}", id))),
            Err(StoreError::NotFound(_)) => Err(Error::NotFound(format!("Message {}", id))),
            Err(e) => Err(e.into()),
        }
    }

    fn user(&self, id: &Uid, role: &str) -> Result<UserNode> {
        match self.store.node(id) {
            Ok(Node::User(user)) => Ok(user),
            Ok(Node::Other { .. }) => Err(Error::NotFound(format!("{} not a User", role))),
            Err(StoreError::NotFound(_)) => Err(Error::NotFound(format!("{} not found", role))),
            Err(e) => Err(e.into()),
        }
    }
}

// An edge without content or a timestamp cannot be rendered; such edges
// are skipped, not fatal.
fn view(edge: &Edge) -> Option<MessageView> {
    let (Some(content), Some(timestamp)) = (edge.content(), edge.sent_time()) else {
        log::warn!("message edge {} is missing attributes, skipping", edge.id);
        return None;
    };
    Some(MessageView {
        id: edge.id.to_string(),
        from: edge.tail.to_string(),
        to: edge.head.to_string(),
        message: preview(content),
        is_read: edge.is_read(),
        timestamp,
    })
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_LEN).collect()
}

//! Read-once notification feed.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{NotificationView, Uid, NOTIFICATION_BATCH};
use crate::store::{GraphStore, Node, StoreError};

pub struct NotificationReader {
    store: Arc<dyn GraphStore>,
    batch_limit: usize,
}

impl NotificationReader {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_batch_limit(store, NOTIFICATION_BATCH)
    }

    pub fn with_batch_limit(store: Arc<dyn GraphStore>, batch_limit: usize) -> Self {
        Self { store, batch_limit }
    }

    /// Hand out up to `max_count` pending notifications in chronological
    /// order and advance the cursor past them, so repeated calls never
    /// redeliver an entry.
    ///
    /// Entries whose source edge no longer resolves are consumed and
    /// dropped rather than left wedging the queue head.
    pub fn read_next(&self, user: &Uid, max_count: usize) -> Result<Vec<NotificationView>> {
        let records = self
            .store
            .unread_notifications(user, max_count.min(self.batch_limit))?;
        let mut views = Vec::with_capacity(records.len());
        let mut consumed = Vec::with_capacity(records.len());
        for record in records {
            consumed.push(record.id.clone());
            let actor = self
                .store
                .edge(&record.edge_id)
                .and_then(|edge| self.store.node(&edge.tail));
            match actor {
                Ok(Node::User(user)) => views.push(NotificationView {
                    username: user.username,
                    avatar: user.avatar,
                    label: record.label,
                }),
                Ok(Node::Other { .. }) | Err(StoreError::NotFound(_)) => {
                    log::warn!("notification {} no longer resolves, dropping", record.id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.store.consume_notifications(&consumed)?;
        Ok(views)
    }
}

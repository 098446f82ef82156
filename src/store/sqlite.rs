//! Reference SQLite-backed graph store.
//!
//! Backs the [`GraphStore`](super::GraphStore) capability with three tables:
//! nodes, edges and the per-user notification queue. Conflicting edge
//! mutations are serialized by the connection mutex.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Uid;

use super::{
    AttrMap, Edge, EdgeKind, GraphStore, Node, NotificationRecord, StoreError, StoreResult,
    UserNode,
};

/// Thread-safe SQLite graph store.
pub struct SqliteGraph {
    conn: Arc<Mutex<Connection>>,
}

// Raw edge row: id, kind, tail, head, attributes JSON.
type RawEdge = (String, String, String, String, String);

impl SqliteGraph {
    /// Open (or create) a store at the given database path.
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                attributes TEXT DEFAULT '{}',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                tail TEXT NOT NULL,
                head TEXT NOT NULL,
                attributes TEXT DEFAULT '{}',
                created_at TEXT NOT NULL,
                FOREIGN KEY (tail) REFERENCES nodes(id),
                FOREIGN KEY (head) REFERENCES nodes(id)
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                edge_id TEXT NOT NULL,
                label TEXT NOT NULL,
                consumed INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES nodes(id)
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);
            CREATE INDEX IF NOT EXISTS idx_edges_tail ON edges(tail, kind);
            CREATE INDEX IF NOT EXISTS idx_edges_head ON edges(head, kind);
            CREATE INDEX IF NOT EXISTS idx_notifications_user
                ON notifications(user_id, consumed);
            "#,
        )?;
        Ok(())
    }

    fn select_edges(&self, where_clause: &str, args: &[&str]) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT id, kind, tail, head, attributes FROM edges
             WHERE {} ORDER BY created_at ASC, rowid ASC",
            where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), row_to_raw_edge)?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(edge_from_raw(row?)?);
        }
        Ok(edges)
    }
}

impl GraphStore for SqliteGraph {
    fn node(&self, id: &Uid) -> StoreResult<Node> {
        let conn = self.conn.lock().unwrap();
        let (kind, attrs): (String, String) = conn
            .query_row(
                "SELECT kind, attributes FROM nodes WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("Node {}", id))
                }
                _ => StoreError::Database(e),
            })?;
        node_from_parts(id.clone(), kind, &attrs)
    }

    fn edge(&self, id: &Uid) -> StoreResult<Edge> {
        let conn = self.conn.lock().unwrap();
        let raw: RawEdge = conn
            .query_row(
                "SELECT id, kind, tail, head, attributes FROM edges WHERE id = ?1",
                params![id.as_str()],
                row_to_raw_edge,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("Edge {}", id))
                }
                _ => StoreError::Database(e),
            })?;
        edge_from_raw(raw)
    }

    fn create_node(&self, kind: &str, attrs: AttrMap) -> StoreResult<Node> {
        let conn = self.conn.lock().unwrap();
        let id = Uid::mint();
        let attrs_json = serde_json::to_string(&attrs)?;
        conn.execute(
            "INSERT INTO nodes (id, kind, attributes, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), kind, attrs_json, Utc::now().to_rfc3339()],
        )?;
        node_from_parts(id, kind.to_string(), &attrs_json)
    }

    fn create_edge(
        &self,
        kind: EdgeKind,
        tail: &Uid,
        head: &Uid,
        attrs: AttrMap,
    ) -> StoreResult<Edge> {
        let conn = self.conn.lock().unwrap();
        let id = Uid::mint();
        conn.execute(
            "INSERT INTO edges (id, kind, tail, head, attributes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.as_str(),
                kind.as_str(),
                tail.as_str(),
                head.as_str(),
                serde_json::to_string(&attrs)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(Edge {
            id,
            kind,
            tail: tail.clone(),
            head: head.clone(),
            attrs,
        })
    }

    fn destroy_edge(&self, id: &Uid) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM edges WHERE id = ?1", params![id.as_str()])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("Edge {}", id)));
        }
        Ok(())
    }

    fn edges_in(&self, node: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>> {
        self.select_edges("head = ?1 AND kind = ?2", &[node.as_str(), kind.as_str()])
    }

    fn edges_out(&self, node: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>> {
        self.select_edges("tail = ?1 AND kind = ?2", &[node.as_str(), kind.as_str()])
    }

    fn edges_from_to(&self, tail: &Uid, head: &Uid, kind: EdgeKind) -> StoreResult<Vec<Edge>> {
        self.select_edges(
            "tail = ?1 AND head = ?2 AND kind = ?3",
            &[tail.as_str(), head.as_str(), kind.as_str()],
        )
    }

    fn set_edge_attr(&self, id: &Uid, key: &str, value: Value) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let attrs_json: String = conn
            .query_row(
                "SELECT attributes FROM edges WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("Edge {}", id))
                }
                _ => StoreError::Database(e),
            })?;
        let mut attrs: AttrMap = serde_json::from_str(&attrs_json)?;
        attrs.insert(key.to_string(), value);
        conn.execute(
            "UPDATE edges SET attributes = ?1 WHERE id = ?2",
            params![serde_json::to_string(&attrs)?, id.as_str()],
        )?;
        Ok(())
    }

    fn mark_conversation_read(&self, a: &Uid, b: &Uid) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let raws: Vec<RawEdge> = {
            let mut stmt = conn.prepare(
                "SELECT id, kind, tail, head, attributes FROM edges
                 WHERE kind = 'message'
                   AND ((tail = ?1 AND head = ?2) OR (tail = ?2 AND head = ?1))
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![a.as_str(), b.as_str()], row_to_raw_edge)?;
            let mut raws = Vec::new();
            for row in rows {
                raws.push(row?);
            }
            raws
        };
        let mut edges = Vec::with_capacity(raws.len());
        for raw in raws {
            let mut edge = edge_from_raw(raw)?;
            edge.attrs.insert("is_read".to_string(), Value::Bool(true));
            conn.execute(
                "UPDATE edges SET attributes = ?1 WHERE id = ?2",
                params![serde_json::to_string(&edge.attrs)?, edge.id.as_str()],
            )?;
            edges.push(edge);
        }
        Ok(edges)
    }

    fn members(&self) -> StoreResult<Vec<Node>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, kind, attributes FROM nodes WHERE kind = 'user'
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut nodes = Vec::new();
        for row in rows {
            let (id, kind, attrs) = row?;
            nodes.push(node_from_parts(Uid::unchecked(id), kind, &attrs)?);
        }
        Ok(nodes)
    }

    fn founder(&self) -> StoreResult<Uid> {
        let conn = self.conn.lock().unwrap();
        let id: String = conn
            .query_row(
                "SELECT id FROM nodes WHERE kind = 'user'
                 ORDER BY created_at ASC, rowid ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound("Founder".to_string())
                }
                _ => StoreError::Database(e),
            })?;
        Ok(Uid::unchecked(id))
    }

    fn enqueue_notification(&self, user: &Uid, edge: &Uid, label: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO notifications (id, user_id, edge_id, label, consumed, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                Uuid::new_v4().to_string(),
                user.as_str(),
                edge.as_str(),
                label,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn unread_notifications(
        &self,
        user: &Uid,
        max: usize,
    ) -> StoreResult<Vec<NotificationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, edge_id, label, created_at FROM notifications
             WHERE user_id = ?1 AND consumed = 0
             ORDER BY created_at ASC, rowid ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user.as_str(), max as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, user_id, edge_id, label, created_at) = row?;
            records.push(NotificationRecord {
                id,
                user_id: Uid::unchecked(user_id),
                edge_id: Uid::unchecked(edge_id),
                label,
                created_at: parse_datetime(created_at),
            });
        }
        Ok(records)
    }

    fn consume_notifications(&self, ids: &[String]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        for id in ids {
            conn.execute(
                "UPDATE notifications SET consumed = 1 WHERE id = ?1",
                params![id],
            )?;
        }
        Ok(())
    }
}

fn row_to_raw_edge(row: &rusqlite::Row) -> rusqlite::Result<RawEdge> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn edge_from_raw((id, kind, tail, head, attrs): RawEdge) -> StoreResult<Edge> {
    let kind = EdgeKind::parse(&kind).ok_or_else(|| StoreError::NotFound(format!("Edge {}", id)))?;
    Ok(Edge {
        id: Uid::unchecked(id),
        kind,
        tail: Uid::unchecked(tail),
        head: Uid::unchecked(head),
        attrs: serde_json::from_str(&attrs)?,
    })
}

fn node_from_parts(id: Uid, kind: String, attrs_json: &str) -> StoreResult<Node> {
    if kind != "user" {
        return Ok(Node::Other { id, kind });
    }
    let attrs: AttrMap = serde_json::from_str(attrs_json)?;
    Ok(Node::User(UserNode {
        id,
        username: attr_str(&attrs, "username"),
        email: attr_str(&attrs, "email"),
        avatar: attr_str(&attrs, "avatar"),
        password_hash: attr_str(&attrs, "password_hash"),
        is_editor: attrs
            .get("is_editor")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }))
}

fn attr_str(attrs: &AttrMap, key: &str) -> String {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

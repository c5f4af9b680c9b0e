//! Row-level change feed.
//!
//! Every insert/delete (and profile role update) appends an event to the
//! `changes` table inside the same transaction as the mutation, so sidecars
//! sharing a workspace observe each other's writes. Subscribers keep a cursor and poll for newer events.
//!
//! Only the newest `RETAINED_CHANGES` events survive a workspace open. A reader
//! whose cursor fell behind the retained window is told it missed events and
//! should re-fetch whole collections.

use rusqlite::Connection;
use serde::Serialize;

pub const RETAINED_CHANGES: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn key(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub seq: i64,
    pub table: String,
    pub kind: ChangeKind,
    pub row_id: String,
}

pub fn record_change(
    conn: &Connection,
    table: &str,
    kind: ChangeKind,
    row_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO changes(table_name, kind, row_id) VALUES(?, ?, ?)",
        (table, kind.key(), row_id),
    )?;
    Ok(())
}

pub fn latest_seq(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM changes", [], |r| r.get(0))
}

/// Keeps the newest `keep` events and deletes the rest.
pub fn prune_changes(conn: &Connection, keep: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM changes
         WHERE seq <= (SELECT COALESCE(MAX(seq), 0) FROM changes) - ?",
        [keep],
    )
}

/// True when some event newer than `seq` has already been pruned.
pub fn missed_since(conn: &Connection, seq: i64) -> rusqlite::Result<bool> {
    let oldest: Option<i64> = conn.query_row("SELECT MIN(seq) FROM changes", [], |r| r.get(0))?;
    Ok(oldest.is_some_and(|oldest| seq + 1 < oldest))
}

pub fn changes_since(conn: &Connection, seq: i64, limit: usize) -> rusqlite::Result<Vec<ChangeEvent>> {
    let mut stmt = conn.prepare(
        "SELECT seq, table_name, kind, row_id
         FROM changes
         WHERE seq > ?
         ORDER BY seq
         LIMIT ?",
    )?;
    let rows = stmt.query_map((seq, limit as i64), |r| {
        let kind: String = r.get(2)?;
        Ok(ChangeEvent {
            seq: r.get(0)?,
            table: r.get(1)?,
            kind: match kind.as_str() {
                "delete" => ChangeKind::Delete,
                "update" => ChangeKind::Update,
                _ => ChangeKind::Insert,
            },
            row_id: r.get(3)?,
        })
    })?;
    rows.collect()
}

/// A polling cursor over the feed, optionally narrowed to some tables.
#[derive(Debug, Clone)]
pub struct Subscription {
    cursor: i64,
    tables: Option<Vec<String>>,
}

impl Subscription {
    /// Starts after the newest event currently in the feed.
    pub fn from_now(conn: &Connection, tables: Option<Vec<String>>) -> rusqlite::Result<Self> {
        Ok(Self {
            cursor: latest_seq(conn)?,
            tables,
        })
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Returns events newer than the cursor and advances past them, including
    /// events for tables this subscription ignores.
    pub fn poll(&mut self, conn: &Connection) -> rusqlite::Result<Vec<ChangeEvent>> {
        let events = changes_since(conn, self.cursor, 500)?;
        if let Some(last) = events.last() {
            self.cursor = last.seq;
        }
        Ok(match &self.tables {
            Some(tables) => events
                .into_iter()
                .filter(|e| tables.iter().any(|t| t == &e.table))
                .collect(),
            None => events,
        })
    }
}

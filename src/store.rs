//! Append-only note store backed by SQLite.
//!
//! One row per classified note, never updated or deleted. Callers retrying a
//! request may produce duplicate rows; the store does not deduplicate.

use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use crate::record::StoredRecord;

pub struct NoteStore {
    conn: Mutex<Connection>,
}

impl NoteStore {
    /// Helper to lock the connection
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Note store lock poisoned: {}", e))
    }

    /// Create or open the database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at TEXT,
                received_at TEXT NOT NULL,
                item_type TEXT NOT NULL,
                time_bucket TEXT NOT NULL,
                category TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Append one row. The row is never touched again.
    pub fn append(&self, row: &StoredRecord) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO notes (text, created_at, received_at, item_type, time_bucket, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.text,
                row.created_at,
                row.received_at,
                row.item_type,
                row.time_bucket,
                row.category
            ],
        )?;
        Ok(())
    }

    /// Most recently received rows, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT text, created_at, received_at, item_type, time_bucket, category
             FROM notes ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(StoredRecord {
                    text: row.get(0)?,
                    created_at: row.get(1)?,
                    received_at: row.get(2)?,
                    item_type: row.get(3)?,
                    time_bucket: row.get(4)?,
                    category: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(text: &str) -> StoredRecord {
        StoredRecord {
            text: text.to_string(),
            created_at: Some("2025-12-08T08:59:00-05:00".to_string()),
            received_at: "2025-12-08T09:00:00-05:00".to_string(),
            item_type: "event".to_string(),
            time_bucket: "2025-12-10T06:00:00-05:00".to_string(),
            category: "health".to_string(),
        }
    }

    #[test]
    fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("notes.db")).unwrap();

        store.append(&sample_row("Gym session")).unwrap();
        let rows = store.recent(10).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "Gym session");
        assert_eq!(rows[0].item_type, "event");
        assert_eq!(rows[0].time_bucket, "2025-12-10T06:00:00-05:00");
        assert_eq!(rows[0].category, "health");
        assert_eq!(
            rows[0].created_at.as_deref(),
            Some("2025-12-08T08:59:00-05:00")
        );
    }

    #[test]
    fn recent_returns_newest_first_with_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("notes.db")).unwrap();

        for i in 0..5 {
            store.append(&sample_row(&format!("note {}", i))).unwrap();
        }

        let rows = store.recent(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "note 4");
        assert_eq!(rows[1].text, "note 3");
    }

    #[test]
    fn duplicate_rows_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("notes.db")).unwrap();

        store.append(&sample_row("same note")).unwrap();
        store.append(&sample_row("same note")).unwrap();
        assert_eq!(store.recent(10).unwrap().len(), 2);
    }

    #[test]
    fn missing_created_at_round_trips_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path().join("notes.db")).unwrap();

        let mut row = sample_row("no client timestamp");
        row.created_at = None;
        store.append(&row).unwrap();

        let rows = store.recent(1).unwrap();
        assert!(rows[0].created_at.is_none());
    }
}

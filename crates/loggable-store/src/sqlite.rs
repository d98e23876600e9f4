// sqlite.rs — SQLite-backed LogStore.
//
// Entries are rows in a single `log_entries` table. `data` is stored as a
// JSON text column; timestamps as RFC 3339 text. A flush runs inside one
// transaction so a failed write leaves no partial cycle behind.

use std::path::Path;

use chrono::{DateTime, Utc};
use loggable_entry::{EntryPatch, LogAction, LogData, LogEntry};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LogStore, PendingWork};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log_entries (
    id           TEXT PRIMARY KEY,
    action       TEXT NOT NULL,
    username     TEXT,
    object_class TEXT NOT NULL,
    object_id    TEXT,
    version      INTEGER NOT NULL,
    logged_at    TEXT NOT NULL,
    data         TEXT
);
CREATE INDEX IF NOT EXISTS log_entries_lookup
    ON log_entries (object_class, object_id, version);
";

const SELECT_COLUMNS: &str =
    "id, action, username, object_class, object_id, version, logged_at, data";

/// A LogStore backed by a SQLite database.
pub struct SqliteStore {
    conn: Connection,
    pending: PendingWork,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// An in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            pending: PendingWork::new(),
        })
    }

    fn select_one(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM log_entries WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![entry_id.to_string()], entry_from_row)
            .optional()?)
    }
}

impl LogStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn persist(&mut self, entry: LogEntry) -> Result<(), StoreError> {
        self.pending.stage(entry);
        Ok(())
    }

    fn schedule_extra_update(
        &mut self,
        entry_id: Uuid,
        patch: EntryPatch,
    ) -> Result<(), StoreError> {
        if self.pending.patch_staged(entry_id, &patch) {
            return Ok(());
        }
        if self.select_one(entry_id)?.is_some() {
            self.pending.queue_update(entry_id, patch);
            return Ok(());
        }
        Err(StoreError::UnknownEntry(entry_id))
    }

    fn flush(&mut self) -> Result<usize, StoreError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let (inserts, updates) = self.pending.drain();
        let written = inserts.len();

        let tx = self.conn.transaction()?;
        for entry in &inserts {
            let data = entry.data.as_ref().map(serde_json::to_string).transpose()?;
            tx.execute(
                "INSERT INTO log_entries
                    (id, action, username, object_class, object_id, version, logged_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.id.to_string(),
                    entry.action.as_str(),
                    entry.username,
                    entry.object_class,
                    entry.object_id,
                    entry.version,
                    entry.logged_at.to_rfc3339(),
                    data,
                ],
            )?;
        }
        for (id, patch) in &updates {
            match patch {
                EntryPatch::ObjectId { new, .. } => {
                    tx.execute(
                        "UPDATE log_entries SET object_id = ?2 WHERE id = ?1",
                        params![id.to_string(), new],
                    )?;
                }
                EntryPatch::Data { new, .. } => {
                    tx.execute(
                        "UPDATE log_entries SET data = ?2 WHERE id = ?1",
                        params![id.to_string(), serde_json::to_string(new)?],
                    )?;
                }
            }
        }
        tx.commit()?;

        tracing::debug!(written, updated = updates.len(), "sqlite store flushed");
        Ok(written)
    }

    fn max_version(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Option<u32>, StoreError> {
        let max: Option<u32> = self.conn.query_row(
            "SELECT MAX(version) FROM log_entries WHERE object_class = ?1 AND object_id = ?2",
            params![object_class, object_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn find(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError> {
        if let Some(entry) = self.pending.staged(entry_id) {
            return Ok(Some(entry.clone()));
        }
        Ok(self.select_one(entry_id)?.map(|mut entry| {
            self.pending.overlay(&mut entry);
            entry
        }))
    }

    fn entries_for(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM log_entries
             WHERE object_class = ?1 AND object_id = ?2
             ORDER BY version DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![object_class, object_id], entry_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.drain();
        dropped
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let id: String = row.get(0)?;
    let action: String = row.get(1)?;
    let logged_at: String = row.get(6)?;
    let data: Option<String> = row.get(7)?;

    let id = Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?;
    let action = action.parse::<LogAction>().map_err(|e| {
        conversion_error(
            1,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;
    let logged_at = DateTime::parse_from_rfc3339(&logged_at)
        .map_err(|e| conversion_error(6, e))?
        .with_timezone(&Utc);
    let data = data
        .map(|json| serde_json::from_str::<LogData>(&json))
        .transpose()
        .map_err(|e| conversion_error(7, e))?;

    Ok(LogEntry {
        id,
        action,
        username: row.get(2)?,
        object_class: row.get(3)?,
        object_id: row.get(4)?,
        version: row.get(5)?,
        logged_at,
        data,
    })
}

// jsonl.rs — Append-only JSON Lines LogStore.
//
// One JSON object per line. Each record carries the full entry plus the
// SHA-256 of the previous line, forming a hash chain that exposes any
// insertion, deletion, or edit of earlier lines.
//
// The file is never rewritten. An in-place update of an already-written
// entry appends a superseding record with the same `id`; readers keep the
// last record per id.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use loggable_entry::{EntryPatch, LogEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::hasher;
use crate::store::{LogStore, PendingWork};

/// One line of the JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonlRecord {
    #[serde(flatten)]
    entry: LogEntry,
    /// Hash of the previous line. None for the first line.
    previous_hash: Option<String>,
}

/// A LogStore backed by an append-only JSONL file.
pub struct JsonlStore {
    path: PathBuf,
    /// Latest state of each written entry, in first-write order.
    entries: Vec<LogEntry>,
    index: HashMap<Uuid, usize>,
    last_hash: Option<String>,
    pending: PendingWork,
}

impl JsonlStore {
    /// Open (or create on first flush) a store at the given path.
    ///
    /// Existing content is loaded so versions continue and the hash chain
    /// links correctly.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path,
            entries: Vec::new(),
            index: HashMap::new(),
            last_hash: None,
            pending: PendingWork::new(),
        };

        if store.path.exists() {
            for line in read_lines(&store.path)? {
                let record: JsonlRecord = serde_json::from_str(&line)?;
                store.upsert(record.entry);
                store.last_hash = Some(hasher::hash_str(&line));
            }
        }

        Ok(store)
    }

    /// Return the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the latest state of every entry in a log file.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<LogEntry>, StoreError> {
        Ok(Self::open(path)?.entries)
    }

    /// Verify the integrity of a log file's hash chain.
    ///
    /// Returns `Ok(true)` if every record links to the line before it, or an
    /// `IntegrityViolation` naming the first broken line.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, StoreError> {
        let mut previous_hash: Option<String> = None;

        for (line_num, line) in read_numbered_lines(path.as_ref())? {
            let record: JsonlRecord = serde_json::from_str(&line)?;
            if record.previous_hash != previous_hash {
                return Err(StoreError::IntegrityViolation {
                    line: line_num,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: record.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // Hash the raw line, not a re-serialization, so field order
            // changes are detected too.
            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(true)
    }

    fn upsert(&mut self, entry: LogEntry) {
        match self.index.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn append(&mut self, writer: &mut impl Write, entry: &LogEntry) -> Result<(), StoreError> {
        let record = JsonlRecord {
            entry: entry.clone(),
            previous_hash: self.last_hash.clone(),
        };
        let json = serde_json::to_string(&record)?;
        writeln!(writer, "{}", json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }
}

impl LogStore for JsonlStore {
    fn name(&self) -> &str {
        "jsonl"
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
        if self.index.contains_key(&entry_id) {
            self.pending.queue_update(entry_id, patch);
            return Ok(());
        }
        Err(StoreError::UnknownEntry(entry_id))
    }

    fn flush(&mut self) -> Result<usize, StoreError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);

        let (inserts, updates) = self.pending.drain();
        let written = inserts.len();

        for entry in inserts {
            self.append(&mut writer, &entry)?;
            self.upsert(entry);
        }

        for (id, patch) in updates {
            let Some(&pos) = self.index.get(&id) else {
                continue;
            };
            let mut entry = self.entries[pos].clone();
            entry.apply(&patch);
            self.append(&mut writer, &entry)?;
            self.entries[pos] = entry;
        }

        writer.flush().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), written, "jsonl store flushed");
        Ok(written)
    }

    fn max_version(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Option<u32>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.object_class == object_class)
            .filter(|e| e.object_id.as_deref() == Some(object_id))
            .map(|e| e.version)
            .max())
    }

    fn find(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError> {
        if let Some(entry) = self.pending.staged(entry_id) {
            return Ok(Some(entry.clone()));
        }
        Ok(self.index.get(&entry_id).map(|&pos| {
            let mut entry = self.entries[pos].clone();
            self.pending.overlay(&mut entry);
            entry
        }))
    }

    fn entries_for(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let mut entries: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|e| e.object_class == object_class)
            .filter(|e| e.object_id.as_deref() == Some(object_id))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.version.cmp(&a.version));
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

/// Non-blank lines of a file.
fn read_lines(path: &Path) -> Result<Vec<String>, StoreError> {
    Ok(read_numbered_lines(path)?
        .into_iter()
        .map(|(_, line)| line)
        .collect())
}

/// Non-blank lines of a file with their 1-based line numbers.
fn read_numbered_lines(path: &Path) -> Result<Vec<(usize, String)>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if !line.trim().is_empty() {
            lines.push((idx + 1, line));
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loggable_entry::{Identifier, LogAction, LogData};
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(version: u32) -> LogEntry {
        LogEntry::new(LogAction::Update, "Page")
            .with_object_id(&Identifier::from(1i64))
            .with_version(version)
    }

    #[test]
    fn flush_and_reopen_keeps_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        {
            let mut store = JsonlStore::open(&path).unwrap();
            store.persist(entry(1)).unwrap();
            store.persist(entry(2)).unwrap();
            assert_eq!(store.flush().unwrap(), 2);
        }

        let store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.max_version("Page", "1").unwrap(), Some(2));
        assert_eq!(JsonlStore::read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn hash_chain_is_valid_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        for version in 1..=3 {
            let mut store = JsonlStore::open(&path).unwrap();
            store.persist(entry(version)).unwrap();
            store.flush().unwrap();
        }

        assert!(JsonlStore::verify_chain(&path).unwrap());
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_append_keeps_chain_head() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut store = JsonlStore::open(&path).unwrap();
        store.persist(entry(1)).unwrap();
        store.flush().unwrap();
        let head = store.last_hash.clone();

        let result = store.append(&mut BrokenWriter, &entry(2));
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.last_hash, head);

        store.persist(entry(3)).unwrap();
        store.flush().unwrap();
        assert!(JsonlStore::verify_chain(&path).unwrap());
    }

    #[test]
    fn tampered_line_breaks_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        {
            let mut store = JsonlStore::open(&path).unwrap();
            store.persist(entry(1)).unwrap();
            store.persist(entry(2)).unwrap();
            store.persist(entry(3)).unwrap();
            store.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("\"version\":1", "\"version\":7", 1);
        std::fs::write(&path, tampered).unwrap();

        let result = JsonlStore::verify_chain(&path);
        assert!(matches!(
            result,
            Err(StoreError::IntegrityViolation { line: 2, .. })
        ));
    }

    #[test]
    fn patch_after_write_appends_superseding_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let mut store = JsonlStore::open(&path).unwrap();
        let created = LogEntry::new(LogAction::Create, "Page");
        let id = created.id;
        store.persist(created).unwrap();
        store.flush().unwrap();

        let mut data = LogData::new();
        data.insert("title".into(), json!("Title"));
        store
            .schedule_extra_update(
                id,
                EntryPatch::ObjectId {
                    old: None,
                    new: "11".into(),
                },
            )
            .unwrap();
        store
            .schedule_extra_update(id, EntryPatch::Data { old: None, new: data })
            .unwrap();
        assert_eq!(store.flush().unwrap(), 0);

        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 3);

        let entries = JsonlStore::read_all(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].object_id.as_deref(), Some("11"));
        assert_eq!(entries[0].data.as_ref().unwrap()["title"], json!("Title"));
        assert!(JsonlStore::verify_chain(&path).unwrap());
    }
}

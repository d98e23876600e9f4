// memory.rs — In-process LogStore.
//
// Written entries live in a Vec in insertion order. Used as the log table
// of the in-memory host and as a secondary store in tests.

use loggable_entry::{EntryPatch, LogEntry};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LogStore, PendingWork};

/// A LogStore that keeps everything in memory.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    written: Vec<LogEntry>,
    pending: PendingWork,
    flushes: usize,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: Vec::new(),
            pending: PendingWork::new(),
            flushes: 0,
        }
    }

    /// All written entries in write order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.written
    }

    /// How many times `flush` has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl LogStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
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
        if self.written.iter().any(|e| e.id == entry_id) {
            self.pending.queue_update(entry_id, patch);
            return Ok(());
        }
        Err(StoreError::UnknownEntry(entry_id))
    }

    fn flush(&mut self) -> Result<usize, StoreError> {
        self.flushes += 1;
        let (inserts, updates) = self.pending.drain();
        let written = inserts.len();
        self.written.extend(inserts);
        for (id, patch) in updates {
            if let Some(entry) = self.written.iter_mut().find(|e| e.id == id) {
                entry.apply(&patch);
            }
        }
        tracing::debug!(store = %self.name, written, "memory store flushed");
        Ok(written)
    }

    fn max_version(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Option<u32>, StoreError> {
        Ok(self
            .written
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
        Ok(self.written.iter().find(|e| e.id == entry_id).map(|e| {
            let mut entry = e.clone();
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
            .written
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

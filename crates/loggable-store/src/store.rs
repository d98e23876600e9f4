// store.rs — LogStore trait and the pending unit of work shared by backends.
//
// A LogStore behaves like a small unit of work: entries are staged with
// `persist`, corrected in place with `schedule_extra_update`, and written
// by `flush`. The engine never writes directly; it only stages.

use loggable_entry::{EntryPatch, LogEntry};
use uuid::Uuid;

use crate::error::StoreError;

/// Trait for persisting and querying log entries.
///
/// Backends differ only in where written entries live. Staged entries and
/// queued patches are kept in a [`PendingWork`] until `flush`.
pub trait LogStore: Send {
    /// Store display name (for logs and diagnostics).
    fn name(&self) -> &str;

    /// Stage a new entry. Nothing is written until `flush`.
    fn persist(&mut self, entry: LogEntry) -> Result<(), StoreError>;

    /// Apply a single-field correction to a staged or already written entry.
    ///
    /// Returns `StoreError::UnknownEntry` if the store has never seen it.
    fn schedule_extra_update(&mut self, entry_id: Uuid, patch: EntryPatch)
        -> Result<(), StoreError>;

    /// Write all staged entries and queued patches.
    /// Returns the number of new entries written.
    fn flush(&mut self) -> Result<usize, StoreError>;

    /// Highest written version for an object, or `None` without history.
    fn max_version(&self, object_class: &str, object_id: &str)
        -> Result<Option<u32>, StoreError>;

    /// Look up an entry by id, staged or written, with queued patches applied.
    fn find(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError>;

    /// All written entries for an object, newest version first.
    fn entries_for(&self, object_class: &str, object_id: &str)
        -> Result<Vec<LogEntry>, StoreError>;

    /// Number of staged entries plus queued patches awaiting `flush`.
    fn pending_count(&self) -> usize;

    /// Drop everything staged since the last flush. Returns how many
    /// entries and patches were dropped.
    fn discard(&mut self) -> usize;
}

/// Staged inserts and queued patches for one store.
#[derive(Debug, Default)]
pub struct PendingWork {
    inserts: Vec<LogEntry>,
    updates: Vec<(Uuid, EntryPatch)>,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new entry.
    pub fn stage(&mut self, entry: LogEntry) {
        self.inserts.push(entry);
    }

    /// Patch a staged entry in place. Returns false if it is not staged.
    pub fn patch_staged(&mut self, entry_id: Uuid, patch: &EntryPatch) -> bool {
        match self.inserts.iter_mut().find(|e| e.id == entry_id) {
            Some(entry) => {
                entry.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Queue a patch for an entry that has already been written.
    pub fn queue_update(&mut self, entry_id: Uuid, patch: EntryPatch) {
        self.updates.push((entry_id, patch));
    }

    pub fn staged(&self, entry_id: Uuid) -> Option<&LogEntry> {
        self.inserts.iter().find(|e| e.id == entry_id)
    }

    /// Apply every queued patch for `entry` (used by `find` on written entries).
    pub fn overlay(&self, entry: &mut LogEntry) {
        for (id, patch) in &self.updates {
            if *id == entry.id {
                entry.apply(patch);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    /// Take everything staged, leaving the work empty.
    pub fn drain(&mut self) -> (Vec<LogEntry>, Vec<(Uuid, EntryPatch)>) {
        (
            std::mem::take(&mut self.inserts),
            std::mem::take(&mut self.updates),
        )
    }
}

//! Per-flush state.
//!
//! A [`FlushCycle`] is created by `on_flush`, threaded through every
//! `post_persist`, and consumed by `post_flush`. It owns everything that is
//! only meaningful inside one flush: the object arena, the deferred
//! identifier and relation writes, and the secondary stores awaiting a
//! flush. Dropping a cycle (for example after a failed host flush) discards
//! all of it, so nothing leaks into the next cycle.

use std::collections::HashMap;
use std::hash::Hash;

use loggable_entry::{LogAction, LogEntry};
use loggable_store::StoreId;
use uuid::Uuid;

use crate::coordinator::PendingFlush;
use crate::resolver::PendingWrites;
use crate::target::StoreTarget;

/// Cycle-local index of a tracked object. Assigned in first-seen order
/// starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackedIndex(pub usize);

impl std::fmt::Display for TrackedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps host object handles to cycle-local indices.
#[derive(Debug)]
pub struct ObjectArena<O> {
    objects: Vec<O>,
    index: HashMap<O, TrackedIndex>,
}

impl<O: Clone + Eq + Hash> ObjectArena<O> {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Index of `object`, assigning the next one if it is new.
    pub fn track(&mut self, object: &O) -> TrackedIndex {
        if let Some(&idx) = self.index.get(object) {
            return idx;
        }
        let idx = TrackedIndex(self.objects.len());
        self.objects.push(object.clone());
        self.index.insert(object.clone(), idx);
        idx
    }

    /// Index of `object` if it has been tracked in this cycle.
    pub fn lookup(&self, object: &O) -> Option<TrackedIndex> {
        self.index.get(object).copied()
    }

    pub fn get(&self, idx: TrackedIndex) -> Option<&O> {
        self.objects.get(idx.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<O: Clone + Eq + Hash> Default for ObjectArena<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// What an unresolved entry is still waiting for.
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    /// The audited object's own generated identifier.
    ObjectId { object_class: String },
    /// A related object's identifier, to be written at `path` in `data`.
    Relation { path: Vec<String> },
}

/// A log entry left incomplete at the end of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedEntry {
    pub entry_id: Uuid,
    pub target: StoreTarget,
    /// The object whose post-insert signal never arrived.
    pub awaiting: TrackedIndex,
    pub kind: Unresolved,
}

/// Outcome of a completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Scheduled objects that produced no entry (unaudited, embedded, or
    /// no audited change).
    pub skipped: usize,
    /// Secondary stores flushed, in the order they were staged.
    pub stores_flushed: Vec<StoreId>,
    /// Entries still missing an identifier. Empty in a healthy cycle.
    pub unresolved: Vec<UnresolvedEntry>,
}

impl CycleReport {
    pub fn entries_written(&self) -> usize {
        self.created + self.updated + self.removed
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// State scoped to one host flush.
#[derive(Debug)]
pub struct FlushCycle<O> {
    pub(crate) cycle_id: Uuid,
    pub(crate) arena: ObjectArena<O>,
    pub(crate) pending: PendingWrites,
    pub(crate) pending_flush: PendingFlush,
    pub(crate) entries: Vec<LogEntry>,
    pub(crate) skipped: usize,
}

impl<O: Clone + Eq + Hash> FlushCycle<O> {
    pub fn new() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            arena: ObjectArena::new(),
            pending: PendingWrites::new(),
            pending_flush: PendingFlush::new(),
            entries: Vec::new(),
            skipped: 0,
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    /// Entries as synthesized in `on_flush`, before any deferred patch.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn arena(&self) -> &ObjectArena<O> {
        &self.arena
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    pub fn pending_flush(&self) -> &PendingFlush {
        &self.pending_flush
    }

    pub(crate) fn record(&mut self, entry: Option<LogEntry>) {
        match entry {
            Some(entry) => self.entries.push(entry),
            None => self.skipped += 1,
        }
    }

    /// Summarize the cycle. Called once the pending stores are flushed.
    pub(crate) fn into_report(self, stores_flushed: Vec<StoreId>) -> CycleReport {
        let count = |action: LogAction| self.entries.iter().filter(|e| e.action == action).count();
        CycleReport {
            cycle_id: self.cycle_id,
            created: count(LogAction::Create),
            updated: count(LogAction::Update),
            removed: count(LogAction::Remove),
            skipped: self.skipped,
            stores_flushed,
            unresolved: self.pending.unresolved(),
        }
    }
}

impl<O: Clone + Eq + Hash> Default for FlushCycle<O> {
    fn default() -> Self {
        Self::new()
    }
}

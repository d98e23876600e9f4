// testing.rs — A scripted host for engine unit tests.
//
// Objects are indices into a Vec. Each test lays out the flush by hand:
// which objects are scheduled, their change sets, and their identifiers.
// FailingStore is a MemoryStore that can be told to fail.

use std::collections::HashMap;
use std::path::PathBuf;

use loggable_entry::{EntryPatch, Identifier, LogEntry};
use loggable_store::{LogStore, MemoryStore, StoreError};
use serde_json::Value;
use uuid::Uuid;

use crate::adapter::{ClassMetadata, FieldChange, FieldValue, HostAdapter, ObjectChangeSet};

pub struct FakeObject {
    pub class: String,
    pub id: Option<Identifier>,
    pub changes: ObjectChangeSet<usize>,
}

pub struct FakeHost {
    pub objects: Vec<FakeObject>,
    pub classes: HashMap<String, ClassMetadata>,
    pub insertions: Vec<usize>,
    pub updates: Vec<usize>,
    pub deletions: Vec<usize>,
    pub store: MemoryStore,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            classes: HashMap::new(),
            insertions: Vec::new(),
            updates: Vec::new(),
            deletions: Vec::new(),
            store: MemoryStore::new("primary"),
        }
    }

    pub fn class(&mut self, meta: ClassMetadata) -> &mut Self {
        self.classes.insert(meta.name.clone(), meta);
        self
    }

    pub fn object(&mut self, class: &str, id: Option<Identifier>) -> usize {
        self.objects.push(FakeObject {
            class: class.to_string(),
            id,
            changes: ObjectChangeSet::new(),
        });
        self.objects.len() - 1
    }

    /// Record a plain `null -> value` change.
    pub fn set(&mut self, object: usize, field: &str, value: impl Into<Value>) {
        self.change(object, field, FieldValue::null(), FieldValue::Plain(value.into()));
    }

    /// Record a change to an association field.
    pub fn set_ref(&mut self, object: usize, field: &str, related: usize) {
        self.change(object, field, FieldValue::null(), FieldValue::Object(related));
    }

    pub fn change(
        &mut self,
        object: usize,
        field: &str,
        old: FieldValue<usize>,
        new: FieldValue<usize>,
    ) {
        self.objects[object]
            .changes
            .insert(field.to_string(), FieldChange::new(old, new));
    }

    pub fn assign_id(&mut self, object: usize, id: impl Into<Identifier>) {
        self.objects[object].id = Some(id.into());
    }

    /// Clear the schedule and change sets, as the host does after a flush.
    pub fn settle(&mut self) {
        self.insertions.clear();
        self.updates.clear();
        self.deletions.clear();
        for object in &mut self.objects {
            object.changes.clear();
        }
    }
}

impl HostAdapter for FakeHost {
    type Object = usize;

    fn scheduled_insertions(&self) -> Vec<usize> {
        self.insertions.clone()
    }

    fn scheduled_updates(&self) -> Vec<usize> {
        self.updates.clone()
    }

    fn scheduled_deletions(&self) -> Vec<usize> {
        self.deletions.clone()
    }

    fn object_change_set(&self, object: &usize) -> ObjectChangeSet<usize> {
        self.objects[*object].changes.clone()
    }

    fn class_metadata(&self, object: &usize) -> ClassMetadata {
        let class = &self.objects[*object].class;
        self.classes
            .get(class)
            .cloned()
            .unwrap_or_else(|| ClassMetadata::new(class.clone()))
    }

    fn identifier(&self, object: &usize) -> Option<Identifier> {
        self.objects[*object].id.clone()
    }

    fn primary_store(&mut self) -> &mut dyn LogStore {
        &mut self.store
    }
}

pub struct FailingStore {
    pub inner: MemoryStore,
    /// Every `flush` fails, leaving the staged work in place.
    pub fail_flush: bool,
    /// `max_version` fails for this object id.
    pub fail_max_version_for: Option<String>,
}

impl FailingStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryStore::new(name),
            fail_flush: false,
            fail_max_version_for: None,
        }
    }

    fn failure(&self, operation: &str) -> StoreError {
        StoreError::Io {
            path: PathBuf::from(self.inner.name()),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{operation} failed"),
            ),
        }
    }
}

impl LogStore for FailingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn persist(&mut self, entry: LogEntry) -> Result<(), StoreError> {
        self.inner.persist(entry)
    }

    fn schedule_extra_update(&mut self, entry_id: Uuid, patch: EntryPatch) -> Result<(), StoreError> {
        self.inner.schedule_extra_update(entry_id, patch)
    }

    fn flush(&mut self) -> Result<usize, StoreError> {
        if self.fail_flush {
            return Err(self.failure("flush"));
        }
        self.inner.flush()
    }

    fn max_version(&self, object_class: &str, object_id: &str) -> Result<Option<u32>, StoreError> {
        if self.fail_max_version_for.as_deref() == Some(object_id) {
            return Err(self.failure("max_version"));
        }
        self.inner.max_version(object_class, object_id)
    }

    fn find(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError> {
        self.inner.find(entry_id)
    }

    fn entries_for(&self, object_class: &str, object_id: &str) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.entries_for(object_class, object_id)
    }

    fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    fn discard(&mut self) -> usize {
        self.inner.discard()
    }
}

//! Host adapter contract and the metadata it exposes.
//!
//! The engine does not know how the host framework tracks objects. It sees
//! the current flush through a [`HostAdapter`]: the scheduled insertions,
//! updates, and deletions, a field-level diff per object, per-type
//! metadata, and the store that receives log entries by default.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use loggable_entry::Identifier;
use loggable_store::LogStore;
use serde_json::Value;

/// Log-entry type used when a type's config does not name one.
pub const DEFAULT_LOG_ENTRY_TYPE: &str = "LogEntry";

/// How a type's identifier is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdGenerator {
    /// Known before the object is written (natural keys, client-side uuids).
    #[default]
    Assigned,
    /// Only known after the physical insert (auto-increment and similar).
    PostInsert,
}

/// How a single-valued association is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// The target has its own identity; the log records its identifier.
    Reference,
    /// The target is a value object with no identity; the log records its
    /// projected fields.
    Embedded,
}

/// Per-type mapping metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassMetadata {
    /// Type name, recorded as `LogEntry::object_class`.
    pub name: String,
    /// True for document types that only ever live inside another document.
    pub embedded_document: bool,
    pub id_generator: IdGenerator,
    /// Single-valued associations by field name.
    pub associations: BTreeMap<String, AssociationKind>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = generator;
        self
    }

    pub fn embedded_document(mut self) -> Self {
        self.embedded_document = true;
        self
    }

    pub fn with_reference(mut self, field: impl Into<String>) -> Self {
        self.associations
            .insert(field.into(), AssociationKind::Reference);
        self
    }

    pub fn with_embedded(mut self, field: impl Into<String>) -> Self {
        self.associations
            .insert(field.into(), AssociationKind::Embedded);
        self
    }

    pub fn is_embedded_association(&self, field: &str) -> bool {
        self.associations.get(field) == Some(&AssociationKind::Embedded)
    }
}

/// A field value as seen by the host: plain data or another object.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<O> {
    /// Scalars, arrays, and nulls.
    Plain(Value),
    /// A single-valued association target.
    Object(O),
}

impl<O> FieldValue<O> {
    pub fn null() -> Self {
        FieldValue::Plain(Value::Null)
    }
}

impl<O> From<Value> for FieldValue<O> {
    fn from(value: Value) -> Self {
        FieldValue::Plain(value)
    }
}

/// Old and new value of one field in the current flush.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange<O> {
    pub old: FieldValue<O>,
    pub new: FieldValue<O>,
}

impl<O> FieldChange<O> {
    pub fn new(old: FieldValue<O>, new: FieldValue<O>) -> Self {
        Self { old, new }
    }
}

/// Field-level diff for one object: field name to `(old, new)`.
pub type ObjectChangeSet<O> = BTreeMap<String, FieldChange<O>>;

/// The narrow view of the host framework the engine needs.
///
/// `Object` is the host's handle for an in-memory object. Two handles are
/// equal exactly when they denote the same in-memory object; the engine uses
/// them only to key its per-cycle arena.
pub trait HostAdapter {
    type Object: Clone + Eq + Hash + Debug + 'static;

    /// Objects scheduled for insertion in the current flush, in host order.
    fn scheduled_insertions(&self) -> Vec<Self::Object>;

    /// Objects scheduled for update in the current flush.
    fn scheduled_updates(&self) -> Vec<Self::Object>;

    /// Objects scheduled for deletion in the current flush.
    fn scheduled_deletions(&self) -> Vec<Self::Object>;

    /// The field-level diff of an object in the current flush.
    fn object_change_set(&self, object: &Self::Object) -> ObjectChangeSet<Self::Object>;

    /// Mapping metadata for an object's type.
    fn class_metadata(&self, object: &Self::Object) -> ClassMetadata;

    /// The object's identifier, or `None` if it has not been assigned yet.
    fn identifier(&self, object: &Self::Object) -> Option<Identifier>;

    /// True when the type's identifier is only known after the insert.
    fn is_post_insert_generator(&self, meta: &ClassMetadata) -> bool {
        meta.id_generator == IdGenerator::PostInsert
    }

    /// Log-entry type for audited types that do not configure one.
    fn default_log_entry_type(&self) -> &str {
        DEFAULT_LOG_ENTRY_TYPE
    }

    /// The host's own log store, used when no registry route applies.
    /// Written by the host as part of its flush.
    fn primary_store(&mut self) -> &mut dyn LogStore;
}

// entity.rs — Entities as the in-memory mapper sees them.

use std::collections::BTreeMap;

use loggable::FieldValue;
use serde_json::Value;

/// Handle for an entity owned by an [`EntityManager`](crate::EntityManager).
///
/// Handles compare by identity: two clones of the same data are different
/// entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef(pub(crate) usize);

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// A stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    Ref(EntityRef),
}

impl Field {
    pub(crate) fn to_field_value(&self) -> FieldValue<EntityRef> {
        match self {
            Field::Value(value) => FieldValue::Plain(value.clone()),
            Field::Ref(target) => FieldValue::Object(*target),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Ref(_) => None,
        }
    }
}

/// Lifecycle of an entity relative to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Created but never flushed.
    New,
    /// Flushed; changes are detected against the last snapshot.
    Managed,
    /// Deleted by a flush.
    Removed,
}

#[derive(Debug, Clone)]
pub(crate) struct Entity {
    pub class: String,
    pub state: EntityState,
    pub fields: BTreeMap<String, Field>,
    /// Field values as of the last flush. Empty until the first one.
    pub snapshot: BTreeMap<String, Field>,
}

impl Entity {
    pub fn new(class: String) -> Self {
        Self {
            class,
            state: EntityState::New,
            fields: BTreeMap::new(),
            snapshot: BTreeMap::new(),
        }
    }

    /// Fields whose current value differs from the snapshot.
    pub fn changed_fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields
            .iter()
            .filter(|(name, field)| self.snapshot.get(*name) != Some(*field))
    }

    pub fn old_value(&self, field: &str) -> FieldValue<EntityRef> {
        self.snapshot
            .get(field)
            .map(Field::to_field_value)
            .unwrap_or_else(FieldValue::null)
    }
}

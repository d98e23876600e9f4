//! Deferred identifier writes.
//!
//! Two kinds of log entries cannot be completed during `on_flush`:
//!
//! - a create entry whose object gets its identifier from the store on
//!   insert (a pending insert), and
//! - any entry whose data references an object that has not been inserted
//!   yet (a pending relation).
//!
//! Both are keyed by the tracked index of the object they wait for. When
//! the host reports that object as inserted, [`PendingWrites::resolve`]
//! patches the entries in place and removes the pending records.

use std::collections::{BTreeMap, HashMap};

use loggable_entry::{EntryPatch, Identifier, LogData};
use serde_json::Value;
use uuid::Uuid;

use crate::cycle::{TrackedIndex, Unresolved, UnresolvedEntry};
use crate::error::Result;
use crate::target::{StoreAccess, StoreTarget};

/// A create entry waiting for its object's generated identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInsert {
    pub entry_id: Uuid,
    pub target: StoreTarget,
    pub object_class: String,
}

/// A data field waiting for a related object's identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRelation {
    pub entry_id: Uuid,
    pub target: StoreTarget,
    /// Field path inside `data`; longer than one for fields of embedded values.
    pub path: Vec<String>,
}

/// Pending inserts and relations for one cycle.
#[derive(Debug, Default)]
pub struct PendingWrites {
    inserts: HashMap<TrackedIndex, PendingInsert>,
    relations: HashMap<TrackedIndex, Vec<PendingRelation>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pending_insert(&mut self, object: TrackedIndex, pending: PendingInsert) {
        self.inserts.insert(object, pending);
    }

    pub fn register_pending_relation(&mut self, related: TrackedIndex, pending: PendingRelation) {
        self.relations.entry(related).or_default().push(pending);
    }

    pub fn has_pending_insert(&self, object: TrackedIndex) -> bool {
        self.inserts.contains_key(&object)
    }

    pub fn pending_relations(&self, related: TrackedIndex) -> &[PendingRelation] {
        self.relations
            .get(&related)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.relations.is_empty()
    }

    /// Patch every entry waiting for `object` now that its identifier is known.
    ///
    /// Returns the stores that received a patch, in patch order and without
    /// duplicates. Records are removed as they are taken; an object that
    /// nothing waits for is a no-op.
    pub fn resolve(
        &mut self,
        object: TrackedIndex,
        identifier: &Identifier,
        stores: &mut StoreAccess<'_>,
    ) -> Result<Vec<StoreTarget>> {
        let mut touched: Vec<StoreTarget> = Vec::new();

        if let Some(pending) = self.inserts.remove(&object) {
            let store = stores.store(&pending.target)?;
            store.schedule_extra_update(
                pending.entry_id,
                EntryPatch::ObjectId {
                    old: None,
                    new: identifier.to_object_id(),
                },
            )?;
            tracing::debug!(
                entry = %pending.entry_id,
                object_class = %pending.object_class,
                object_id = %identifier,
                "resolved deferred object id"
            );
            touched.push(pending.target);
        }

        if let Some(relations) = self.relations.remove(&object) {
            let value = identifier.to_value();
            for pending in relations {
                let store = stores.store(&pending.target)?;
                let old = store.find(pending.entry_id)?.and_then(|e| e.data);
                let mut new = old.clone().unwrap_or_default();
                set_path(&mut new, &pending.path, value.clone());
                store.schedule_extra_update(pending.entry_id, EntryPatch::Data { old, new })?;
                tracing::debug!(
                    entry = %pending.entry_id,
                    field = %pending.path.join("."),
                    "resolved deferred relation"
                );
                if !touched.contains(&pending.target) {
                    touched.push(pending.target);
                }
            }
        }

        Ok(touched)
    }

    /// Everything still pending, ordered by the object waited for.
    pub fn unresolved(&self) -> Vec<UnresolvedEntry> {
        let mut inserts: BTreeMap<TrackedIndex, &PendingInsert> = BTreeMap::new();
        inserts.extend(self.inserts.iter().map(|(k, v)| (*k, v)));
        let mut relations: BTreeMap<TrackedIndex, &Vec<PendingRelation>> = BTreeMap::new();
        relations.extend(self.relations.iter().map(|(k, v)| (*k, v)));

        let mut out = Vec::new();
        for (idx, pending) in inserts {
            out.push(UnresolvedEntry {
                entry_id: pending.entry_id,
                target: pending.target.clone(),
                awaiting: idx,
                kind: Unresolved::ObjectId {
                    object_class: pending.object_class.clone(),
                },
            });
        }
        for (idx, list) in relations {
            for pending in list {
                out.push(UnresolvedEntry {
                    entry_id: pending.entry_id,
                    target: pending.target.clone(),
                    awaiting: idx,
                    kind: Unresolved::Relation {
                        path: pending.path.clone(),
                    },
                });
            }
        }
        out
    }
}

/// Write `value` at `path`, creating intermediate objects as needed.
fn set_path(data: &mut LogData, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = data;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(LogData::new()));
        if !slot.is_object() {
            *slot = Value::Object(LogData::new());
        }
        match slot {
            Value::Object(map) => current = map,
            _ => return,
        }
    }
    current.insert(last.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use loggable_entry::{LogAction, LogEntry};
    use loggable_store::{LogStore, MemoryStore, StoreId, StoreRegistry};
    use serde_json::json;

    fn staged(store: &mut MemoryStore, data: Option<LogData>) -> Uuid {
        let mut entry = LogEntry::new(LogAction::Create, "Article");
        entry.data = data;
        let id = entry.id;
        store.persist(entry).unwrap();
        id
    }

    #[test]
    fn resolve_pending_insert_patches_object_id() {
        let mut primary = MemoryStore::new("primary");
        let mut registry = StoreRegistry::new();
        let entry_id = staged(&mut primary, None);

        let mut pending = PendingWrites::new();
        pending.register_pending_insert(
            TrackedIndex(0),
            PendingInsert {
                entry_id,
                target: StoreTarget::Primary,
                object_class: "Article".into(),
            },
        );

        let mut access = StoreAccess::new(&mut primary, &mut registry);
        let touched = pending
            .resolve(TrackedIndex(0), &Identifier::from(12i64), &mut access)
            .unwrap();

        assert_eq!(touched, vec![StoreTarget::Primary]);
        assert!(pending.is_empty());
        let entry = primary.find(entry_id).unwrap().unwrap();
        assert_eq!(entry.object_id.as_deref(), Some("12"));
    }

    #[test]
    fn resolve_relation_overwrites_placeholder() {
        let mut primary = MemoryStore::new("primary");
        let mut registry = StoreRegistry::new();
        let mut data = LogData::new();
        data.insert("title".into(), json!("Title"));
        data.insert("author".into(), Value::Null);
        let entry_id = staged(&mut primary, Some(data));

        let mut pending = PendingWrites::new();
        pending.register_pending_relation(
            TrackedIndex(1),
            PendingRelation {
                entry_id,
                target: StoreTarget::Primary,
                path: vec!["author".into()],
            },
        );

        let mut access = StoreAccess::new(&mut primary, &mut registry);
        pending
            .resolve(TrackedIndex(1), &Identifier::from(3i64), &mut access)
            .unwrap();

        let data = primary.find(entry_id).unwrap().unwrap().data.unwrap();
        assert_eq!(data["author"], json!(3));
        assert_eq!(data["title"], json!("Title"));
    }

    #[test]
    fn compound_relation_is_stored_as_map() {
        let mut primary = MemoryStore::new("primary");
        let mut registry = StoreRegistry::new();
        let entry_id = staged(&mut primary, Some(LogData::new()));

        let mut pending = PendingWrites::new();
        pending.register_pending_relation(
            TrackedIndex(0),
            PendingRelation {
                entry_id,
                target: StoreTarget::Primary,
                path: vec!["location".into()],
            },
        );

        let id = Identifier::compound([("lat", json!(54)), ("lng", json!(25))]);
        let mut access = StoreAccess::new(&mut primary, &mut registry);
        pending.resolve(TrackedIndex(0), &id, &mut access).unwrap();

        let data = primary.find(entry_id).unwrap().unwrap().data.unwrap();
        assert_eq!(data["location"], json!({"lat": 54, "lng": 25}));
    }

    #[test]
    fn nested_relation_path_is_patched_in_place() {
        let mut primary = MemoryStore::new("primary");
        let mut registry = StoreRegistry::new();
        let mut data = LogData::new();
        data.insert("address".into(), json!({"street": "Main", "city": null}));
        let entry_id = staged(&mut primary, Some(data));

        let mut pending = PendingWrites::new();
        pending.register_pending_relation(
            TrackedIndex(2),
            PendingRelation {
                entry_id,
                target: StoreTarget::Primary,
                path: vec!["address".into(), "city".into()],
            },
        );

        let mut access = StoreAccess::new(&mut primary, &mut registry);
        pending
            .resolve(TrackedIndex(2), &Identifier::from(9i64), &mut access)
            .unwrap();

        let data = primary.find(entry_id).unwrap().unwrap().data.unwrap();
        assert_eq!(data["address"], json!({"street": "Main", "city": 9}));
    }

    #[test]
    fn resolve_secondary_reports_store_once() {
        let mut primary = MemoryStore::new("primary");
        let mut documents = MemoryStore::new("documents");
        let first = staged(&mut documents, Some(LogData::new()));
        let second = staged(&mut documents, Some(LogData::new()));
        let mut registry = StoreRegistry::new();
        registry.register("documents", Box::new(documents));
        let target = StoreTarget::Secondary(StoreId::new("documents"));

        let mut pending = PendingWrites::new();
        for entry_id in [first, second] {
            pending.register_pending_relation(
                TrackedIndex(0),
                PendingRelation {
                    entry_id,
                    target: target.clone(),
                    path: vec!["author".into()],
                },
            );
        }

        let mut access = StoreAccess::new(&mut primary, &mut registry);
        let touched = pending
            .resolve(TrackedIndex(0), &Identifier::from(1i64), &mut access)
            .unwrap();
        assert_eq!(touched, vec![target]);
    }

    #[test]
    fn unrelated_object_is_a_no_op() {
        let mut primary = MemoryStore::new("primary");
        let mut registry = StoreRegistry::new();
        let mut pending = PendingWrites::new();
        let mut access = StoreAccess::new(&mut primary, &mut registry);
        let touched = pending
            .resolve(TrackedIndex(5), &Identifier::from(1i64), &mut access)
            .unwrap();
        assert!(touched.is_empty());
    }

    #[test]
    fn unresolved_lists_everything_pending() {
        let mut pending = PendingWrites::new();
        let insert_id = Uuid::new_v4();
        let relation_id = Uuid::new_v4();
        pending.register_pending_insert(
            TrackedIndex(0),
            PendingInsert {
                entry_id: insert_id,
                target: StoreTarget::Primary,
                object_class: "Article".into(),
            },
        );
        pending.register_pending_relation(
            TrackedIndex(1),
            PendingRelation {
                entry_id: relation_id,
                target: StoreTarget::Primary,
                path: vec!["author".into()],
            },
        );

        let unresolved = pending.unresolved();
        assert_eq!(unresolved.len(), 2);
        assert_eq!(unresolved[0].entry_id, insert_id);
        assert!(matches!(unresolved[0].kind, Unresolved::ObjectId { .. }));
        assert_eq!(unresolved[1].awaiting, TrackedIndex(1));
    }
}

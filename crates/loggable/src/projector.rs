//! Change-set projection.
//!
//! Reduces an object's flush-time diff to the audited fields and turns
//! association values into something storable: an embedded value becomes
//! its own projected map, a reference becomes the target's identifier. A
//! reference whose target has no identifier yet is stored as `null` and
//! registered as a pending relation.

use std::collections::BTreeMap;

use loggable_entry::LogData;
use serde_json::Value;
use uuid::Uuid;

use crate::adapter::{FieldValue, HostAdapter, ObjectChangeSet};
use crate::config::AuditConfig;
use crate::cycle::FlushCycle;
use crate::resolver::PendingRelation;
use crate::target::StoreTarget;

/// The entry a projection is being written for.
#[derive(Debug, Clone)]
pub struct ProjectionOwner {
    pub entry_id: Uuid,
    pub target: StoreTarget,
}

/// Projects change sets for one adapter against the audited-type table.
pub struct Projector<'a, A: HostAdapter> {
    adapter: &'a A,
    types: &'a BTreeMap<String, AuditConfig>,
}

impl<'a, A: HostAdapter> Projector<'a, A> {
    pub fn new(adapter: &'a A, types: &'a BTreeMap<String, AuditConfig>) -> Self {
        Self { adapter, types }
    }

    /// The audited subset of `change_set`, with associations resolved.
    pub fn project(
        &self,
        object: &A::Object,
        change_set: &ObjectChangeSet<A::Object>,
        config: &AuditConfig,
        owner: &ProjectionOwner,
        cycle: &mut FlushCycle<A::Object>,
    ) -> LogData {
        self.project_at(object, change_set, config, owner, cycle, &[])
    }

    fn project_at(
        &self,
        object: &A::Object,
        change_set: &ObjectChangeSet<A::Object>,
        config: &AuditConfig,
        owner: &ProjectionOwner,
        cycle: &mut FlushCycle<A::Object>,
        prefix: &[String],
    ) -> LogData {
        let meta = self.adapter.class_metadata(object);
        let mut data = LogData::new();

        for (field, change) in change_set {
            if !config.is_versioned(field) {
                continue;
            }

            let value = match &change.new {
                FieldValue::Plain(value) => value.clone(),
                FieldValue::Object(related) if meta.is_embedded_association(field) => {
                    let path = child_path(prefix, field);
                    Value::Object(self.project_embedded(related, owner, cycle, &path))
                }
                FieldValue::Object(related) => match self.adapter.identifier(related) {
                    Some(id) => id.to_value(),
                    None => {
                        let idx = cycle.arena.track(related);
                        cycle.pending.register_pending_relation(
                            idx,
                            PendingRelation {
                                entry_id: owner.entry_id,
                                target: owner.target.clone(),
                                path: child_path(prefix, field),
                            },
                        );
                        tracing::debug!(
                            entry = %owner.entry_id,
                            field = %field,
                            related = %idx,
                            "related object has no identifier yet"
                        );
                        Value::Null
                    }
                },
            };

            data.insert(field.clone(), value);
        }

        data
    }

    fn project_embedded(
        &self,
        embedded: &A::Object,
        owner: &ProjectionOwner,
        cycle: &mut FlushCycle<A::Object>,
        path: &[String],
    ) -> LogData {
        let meta = self.adapter.class_metadata(embedded);
        match self.types.get(&meta.name) {
            Some(config) => {
                let change_set = self.adapter.object_change_set(embedded);
                self.project_at(embedded, &change_set, config, owner, cycle, path)
            }
            None => LogData::new(),
        }
    }
}

fn child_path(prefix: &[String], field: &str) -> Vec<String> {
    let mut path = prefix.to_vec();
    path.push(field.to_string());
    path
}

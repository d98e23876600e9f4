// manager.rs — A minimal unit-of-work object mapper.
//
// Entities are schemaless field maps grouped by registered class. Changes
// are detected by diffing against the snapshot taken at the last flush.
// The manager owns the primary log store and drives the engine's three
// flush signals from `flush`.

use std::collections::{HashMap, HashSet};

use loggable::{
    AssociationKind, ClassMetadata, CycleReport, FieldChange, HostAdapter, IdGenerator,
    LoggableListener, ObjectChangeSet,
};
use loggable_entry::Identifier;
use loggable_store::{LogStore, MemoryStore};
use serde_json::Value;

use crate::entity::{Entity, EntityRef, EntityState, Field};
use crate::error::{HostError, Result};

#[derive(Debug)]
struct ClassDef {
    meta: ClassMetadata,
    key: Vec<String>,
    next_id: i64,
}

/// What the current flush writes.
#[derive(Debug, Default, Clone)]
pub struct FlushPlan {
    pub insertions: Vec<EntityRef>,
    pub updates: Vec<EntityRef>,
    pub deletions: Vec<EntityRef>,
}

impl FlushPlan {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }
}

/// Tracks entities and flushes them, reporting each flush to a
/// [`LoggableListener`].
pub struct EntityManager {
    classes: HashMap<String, ClassDef>,
    entities: Vec<Entity>,
    /// Entities passed to `persist`; only these are ever scheduled.
    roots: HashSet<EntityRef>,
    to_insert: Vec<EntityRef>,
    to_remove: Vec<EntityRef>,
    plan: Option<FlushPlan>,
    log_store: Box<dyn LogStore>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
            entities: Vec::new(),
            roots: HashSet::new(),
            to_insert: Vec::new(),
            to_remove: Vec::new(),
            plan: None,
            log_store: Box::new(MemoryStore::new("primary")),
        }
    }

    /// Replace the primary log store (builder pattern).
    pub fn with_log_store(mut self, store: Box<dyn LogStore>) -> Self {
        self.log_store = store;
        self
    }

    pub fn log_store(&self) -> &dyn LogStore {
        self.log_store.as_ref()
    }

    /// Register a class identified by its `id` field.
    pub fn register_class(&mut self, meta: ClassMetadata) {
        self.register_class_with_key(meta, &["id"]);
    }

    /// Register a class identified by one or more key fields. Generated ids
    /// are written to the first key field.
    pub fn register_class_with_key(&mut self, meta: ClassMetadata, key: &[&str]) {
        let def = ClassDef {
            key: key.iter().map(|k| k.to_string()).collect(),
            meta,
            next_id: 0,
        };
        self.classes.insert(def.meta.name.clone(), def);
    }

    pub fn new_entity(&mut self, class: &str) -> Result<EntityRef> {
        if !self.classes.contains_key(class) {
            return Err(HostError::UnknownClass(class.to_string()));
        }
        self.entities.push(Entity::new(class.to_string()));
        Ok(EntityRef(self.entities.len() - 1))
    }

    pub fn set(&mut self, entity: EntityRef, field: &str, value: impl Into<Value>) -> Result<()> {
        self.live_mut(entity)?
            .fields
            .insert(field.to_string(), Field::Value(value.into()));
        Ok(())
    }

    /// Point an association field at another entity.
    pub fn set_ref(&mut self, entity: EntityRef, field: &str, target: EntityRef) -> Result<()> {
        self.entity(target)?;
        self.live_mut(entity)?
            .fields
            .insert(field.to_string(), Field::Ref(target));
        Ok(())
    }

    pub fn get(&self, entity: EntityRef, field: &str) -> Option<&Field> {
        self.entities.get(entity.0)?.fields.get(field)
    }

    pub fn state(&self, entity: EntityRef) -> Option<EntityState> {
        self.entities.get(entity.0).map(|e| e.state)
    }

    /// Schedule a new entity for insertion. Managed entities are tracked
    /// already; persisting them again only cancels a pending removal.
    pub fn persist(&mut self, entity: EntityRef) -> Result<()> {
        let state = self.entity(entity)?.state;
        match state {
            EntityState::Removed => return Err(HostError::Removed(entity)),
            EntityState::New if !self.to_insert.contains(&entity) => self.to_insert.push(entity),
            EntityState::New => {}
            EntityState::Managed => self.to_remove.retain(|e| *e != entity),
        }
        self.roots.insert(entity);
        Ok(())
    }

    /// Schedule a managed entity for deletion. A new entity is simply
    /// forgotten.
    pub fn remove(&mut self, entity: EntityRef) -> Result<()> {
        let state = self.entity(entity)?.state;
        match state {
            EntityState::New => {
                self.to_insert.retain(|e| *e != entity);
                self.roots.remove(&entity);
            }
            EntityState::Managed if !self.to_remove.contains(&entity) => {
                self.to_remove.push(entity);
            }
            EntityState::Managed | EntityState::Removed => {}
        }
        Ok(())
    }

    /// A new, unpersisted copy of `entity`. Generated key fields are not
    /// copied.
    pub fn clone_entity(&mut self, entity: EntityRef) -> Result<EntityRef> {
        let source = self.entity(entity)?;
        let mut copy = Entity::new(source.class.clone());
        copy.fields = source.fields.clone();
        if let Some(def) = self.classes.get(&source.class) {
            if def.meta.id_generator == IdGenerator::PostInsert {
                if let Some(key) = def.key.first() {
                    copy.fields.remove(key);
                }
            }
        }
        self.entities.push(copy);
        Ok(EntityRef(self.entities.len() - 1))
    }

    /// Compute what the next flush writes. Exposed for hosts that drive the
    /// listener signals by hand; `flush` calls it itself.
    pub fn begin_flush(&mut self) -> &FlushPlan {
        let insertions = self
            .to_insert
            .iter()
            .copied()
            .filter(|e| self.state(*e) == Some(EntityState::New))
            .collect();
        let mut updates: Vec<EntityRef> = self
            .roots
            .iter()
            .copied()
            .filter(|e| self.state(*e) == Some(EntityState::Managed))
            .filter(|e| !self.to_remove.contains(e))
            .filter(|e| self.is_dirty(*e, &mut HashSet::new()))
            .collect();
        updates.sort();

        self.plan.insert(FlushPlan {
            insertions,
            updates,
            deletions: self.to_remove.clone(),
        })
    }

    /// Give an inserted entity its generated id, if its class has one, and
    /// mark it managed.
    pub fn complete_insert(&mut self, entity: EntityRef) -> Result<()> {
        let class = self.entity(entity)?.class.clone();
        let generated = match self.classes.get_mut(&class) {
            Some(def) if def.meta.id_generator == IdGenerator::PostInsert => {
                def.next_id += 1;
                def.key.first().map(|key| (key.clone(), def.next_id))
            }
            _ => None,
        };
        let record = self.live_mut(entity)?;
        if let Some((key, id)) = generated {
            record.fields.insert(key, Field::Value(Value::from(id)));
        }
        record.state = EntityState::Managed;
        Ok(())
    }

    /// Apply deletions, snapshot state, and write the primary log store.
    pub fn commit_flush(&mut self) -> Result<usize> {
        let plan = self.plan.take().ok_or(HostError::NoFlushInProgress)?;
        for entity in &plan.deletions {
            if let Some(record) = self.entities.get_mut(entity.0) {
                record.state = EntityState::Removed;
            }
            self.roots.remove(entity);
        }

        let mut seen = HashSet::new();
        let managed: Vec<EntityRef> = self
            .roots
            .iter()
            .copied()
            .filter(|e| self.state(*e) == Some(EntityState::Managed))
            .collect();
        for entity in managed {
            self.snapshot(entity, &mut seen);
        }

        self.to_insert.retain(|e| !plan.insertions.contains(e));
        self.to_remove.clear();
        let written = self.log_store.flush()?;
        tracing::debug!(
            inserted = plan.insertions.len(),
            updated = plan.updates.len(),
            removed = plan.deletions.len(),
            log_entries = written,
            "entity manager flushed"
        );
        Ok(written)
    }

    /// Drop the current plan and everything staged in the primary log store.
    pub fn abort_flush(&mut self) -> usize {
        self.plan = None;
        self.log_store.discard()
    }

    /// Flush all pending changes, reporting to `listener`.
    pub fn flush(&mut self, listener: &mut LoggableListener<Self>) -> Result<CycleReport> {
        self.begin_flush();
        let mut cycle = match listener.on_flush(self) {
            Ok(cycle) => cycle,
            Err(err) => {
                self.abort_flush();
                return Err(err.into());
            }
        };

        let insertions = self
            .plan
            .as_ref()
            .map(|plan| plan.insertions.clone())
            .unwrap_or_default();
        for entity in insertions {
            let step = match self.complete_insert(entity) {
                Ok(()) => listener
                    .post_persist(&mut cycle, self, &entity)
                    .map_err(HostError::from),
                Err(err) => Err(err),
            };
            if let Err(err) = step {
                self.abort_flush();
                listener.abort(cycle);
                return Err(err);
            }
        }

        if let Err(err) = self.commit_flush() {
            self.abort_flush();
            listener.abort(cycle);
            return Err(err);
        }
        Ok(listener.post_flush(cycle)?)
    }

    fn entity(&self, entity: EntityRef) -> Result<&Entity> {
        self.entities
            .get(entity.0)
            .ok_or(HostError::UnknownEntity(entity))
    }

    fn live_mut(&mut self, entity: EntityRef) -> Result<&mut Entity> {
        let record = self
            .entities
            .get_mut(entity.0)
            .ok_or(HostError::UnknownEntity(entity))?;
        if record.state == EntityState::Removed {
            return Err(HostError::Removed(entity));
        }
        Ok(record)
    }

    fn meta(&self, entity: &Entity) -> ClassMetadata {
        self.classes
            .get(&entity.class)
            .map(|def| def.meta.clone())
            .unwrap_or_else(|| ClassMetadata::new(entity.class.clone()))
    }

    fn embedded_targets(&self, entity: &Entity) -> Vec<EntityRef> {
        let meta = self.meta(entity);
        entity
            .fields
            .iter()
            .filter(|(name, _)| meta.associations.get(*name) == Some(&AssociationKind::Embedded))
            .filter_map(|(_, field)| match field {
                Field::Ref(target) => Some(*target),
                Field::Value(_) => None,
            })
            .collect()
    }

    /// True if the entity or any embedded value under it changed.
    fn is_dirty(&self, entity: EntityRef, seen: &mut HashSet<EntityRef>) -> bool {
        if !seen.insert(entity) {
            return false;
        }
        let Some(record) = self.entities.get(entity.0) else {
            return false;
        };
        if record.changed_fields().next().is_some() {
            return true;
        }
        self.embedded_targets(record)
            .into_iter()
            .any(|target| self.is_dirty(target, seen))
    }

    fn snapshot(&mut self, entity: EntityRef, seen: &mut HashSet<EntityRef>) {
        if !seen.insert(entity) {
            return;
        }
        let Some(record) = self.entities.get(entity.0) else {
            return;
        };
        let embedded = self.embedded_targets(record);
        if let Some(record) = self.entities.get_mut(entity.0) {
            record.snapshot = record.fields.clone();
            record.state = EntityState::Managed;
        }
        for target in embedded {
            self.snapshot(target, seen);
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for EntityManager {
    type Object = EntityRef;

    fn scheduled_insertions(&self) -> Vec<EntityRef> {
        self.plan
            .as_ref()
            .map(|p| p.insertions.clone())
            .unwrap_or_default()
    }

    fn scheduled_updates(&self) -> Vec<EntityRef> {
        self.plan
            .as_ref()
            .map(|p| p.updates.clone())
            .unwrap_or_default()
    }

    fn scheduled_deletions(&self) -> Vec<EntityRef> {
        self.plan
            .as_ref()
            .map(|p| p.deletions.clone())
            .unwrap_or_default()
    }

    fn object_change_set(&self, object: &EntityRef) -> ObjectChangeSet<EntityRef> {
        let mut changes = ObjectChangeSet::new();
        let Some(record) = self.entities.get(object.0) else {
            return changes;
        };
        for (name, field) in record.changed_fields() {
            changes.insert(
                name.clone(),
                FieldChange::new(record.old_value(name), field.to_field_value()),
            );
        }
        // An embedded value that changed in place counts as a change of the
        // field holding it.
        let meta = self.meta(record);
        for (name, field) in &record.fields {
            if changes.contains_key(name) || !meta.is_embedded_association(name) {
                continue;
            }
            if let Field::Ref(target) = field {
                if self.is_dirty(*target, &mut HashSet::new()) {
                    changes.insert(
                        name.clone(),
                        FieldChange::new(record.old_value(name), field.to_field_value()),
                    );
                }
            }
        }
        changes
    }

    fn class_metadata(&self, object: &EntityRef) -> ClassMetadata {
        self.entities
            .get(object.0)
            .map(|record| self.meta(record))
            .unwrap_or_default()
    }

    fn identifier(&self, object: &EntityRef) -> Option<Identifier> {
        let record = self.entities.get(object.0)?;
        let def = self.classes.get(&record.class)?;
        let mut parts = Vec::with_capacity(def.key.len());
        for key in &def.key {
            match record.fields.get(key) {
                Some(Field::Value(value)) if !value.is_null() => {
                    parts.push((key.clone(), value.clone()));
                }
                _ => return None,
            }
        }
        match parts.len() {
            0 => None,
            1 => parts.pop().map(|(_, value)| Identifier::Scalar(value)),
            _ => Some(Identifier::Compound(parts)),
        }
    }

    fn primary_store(&mut self) -> &mut dyn LogStore {
        self.log_store.as_mut()
    }
}

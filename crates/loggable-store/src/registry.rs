// registry.rs — Lookup from log-entry type to the store that persists it.
//
// Entities live in a primary store owned by the host framework. Their log
// entries may live elsewhere (e.g. a relational entity logged into a
// document store). The registry owns those secondary stores and routes each
// log-entry type name to one of them. A type with no route belongs to the
// primary store.

use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::store::LogStore;

/// Identifies a store registered in the [`StoreRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Owns secondary stores and routes log-entry types to them.
#[derive(Default)]
pub struct StoreRegistry {
    stores: BTreeMap<StoreId, Box<dyn LogStore>>,
    routes: HashMap<String, StoreId>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under an id, replacing any previous one.
    pub fn register(&mut self, id: impl Into<StoreId>, store: Box<dyn LogStore>) {
        self.stores.insert(id.into(), store);
    }

    /// Route a log-entry type to a registered store.
    pub fn route(
        &mut self,
        log_entry_type: impl Into<String>,
        id: impl Into<StoreId>,
    ) -> Result<(), StoreError> {
        let id = id.into();
        if !self.stores.contains_key(&id) {
            return Err(StoreError::UnknownStore(id.0));
        }
        self.routes.insert(log_entry_type.into(), id);
        Ok(())
    }

    /// Register a store and route one log-entry type to it (builder pattern).
    pub fn with_store(
        mut self,
        log_entry_type: impl Into<String>,
        id: impl Into<StoreId>,
        store: Box<dyn LogStore>,
    ) -> Self {
        let id = id.into();
        self.stores.insert(id.clone(), store);
        self.routes.insert(log_entry_type.into(), id);
        self
    }

    /// The store responsible for a log-entry type, if not the primary one.
    pub fn store_for(&self, log_entry_type: &str) -> Option<&StoreId> {
        self.routes.get(log_entry_type)
    }

    pub fn get(&self, id: &StoreId) -> Option<&dyn LogStore> {
        self.stores.get(id).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: &StoreId) -> Option<&mut (dyn LogStore + 'static)> {
        self.stores.get_mut(id).map(|s| s.as_mut())
    }

    /// Like `get_mut`, but a missing store is an error.
    pub fn require_mut(&mut self, id: &StoreId) -> Result<&mut (dyn LogStore + 'static), StoreError> {
        self.get_mut(id)
            .ok_or_else(|| StoreError::UnknownStore(id.0.clone()))
    }

    /// Ids of every registered store.
    pub fn ids(&self) -> impl Iterator<Item = &StoreId> {
        self.stores.keys()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn unrouted_type_belongs_to_primary() {
        let registry = StoreRegistry::new();
        assert!(registry.store_for("LogEntry").is_none());
    }

    #[test]
    fn route_to_registered_store() {
        let mut registry = StoreRegistry::new();
        registry.register("documents", Box::new(MemoryStore::new("documents")));
        registry.route("PageRevision", "documents").unwrap();

        let id = registry.store_for("PageRevision").unwrap().clone();
        assert_eq!(id.as_str(), "documents");
        assert_eq!(registry.get(&id).unwrap().name(), "documents");
    }

    #[test]
    fn route_to_unknown_store_fails() {
        let mut registry = StoreRegistry::new();
        let result = registry.route("PageRevision", "documents");
        assert!(matches!(result, Err(StoreError::UnknownStore(id)) if id == "documents"));
    }

    #[test]
    fn with_store_registers_and_routes() {
        let mut registry = StoreRegistry::new().with_store(
            "PageRevision",
            "documents",
            Box::new(MemoryStore::new("documents")),
        );
        let id = StoreId::new("documents");
        assert!(registry.require_mut(&id).is_ok());
        assert!(registry.require_mut(&StoreId::new("missing")).is_err());
    }
}

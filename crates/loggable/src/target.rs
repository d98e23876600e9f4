// target.rs — Which store a log entry belongs to, and access to it.

use loggable_store::{LogStore, StoreError, StoreId, StoreRegistry};

/// The store that owns a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreTarget {
    /// The host's own store, written by the host's flush.
    Primary,
    /// A registry store, flushed by the engine after the host's flush.
    Secondary(StoreId),
}

impl StoreTarget {
    /// Resolve the target for a log-entry type.
    pub fn for_log_entry_type(registry: &StoreRegistry, log_entry_type: &str) -> Self {
        match registry.store_for(log_entry_type) {
            Some(id) => StoreTarget::Secondary(id.clone()),
            None => StoreTarget::Primary,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, StoreTarget::Primary)
    }
}

impl std::fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreTarget::Primary => f.write_str("primary"),
            StoreTarget::Secondary(id) => write!(f, "{id}"),
        }
    }
}

/// Mutable access to both the host's store and the registry stores.
pub struct StoreAccess<'a> {
    pub primary: &'a mut dyn LogStore,
    pub registry: &'a mut StoreRegistry,
}

impl<'a> StoreAccess<'a> {
    pub fn new(primary: &'a mut dyn LogStore, registry: &'a mut StoreRegistry) -> Self {
        Self { primary, registry }
    }

    pub fn store(&mut self, target: &StoreTarget) -> Result<&mut dyn LogStore, StoreError> {
        match target {
            StoreTarget::Primary => Ok(&mut *self.primary),
            StoreTarget::Secondary(id) => Ok(self.registry.require_mut(id)?),
        }
    }
}

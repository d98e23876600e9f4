//! The Loggable listener: entry point for the host's flush signals.
//!
//! A host wires three calls into its flush:
//!
//! ```text
//! let mut cycle = listener.on_flush(&mut host)?;         // before writing
//! for object in inserted {                                // after each insert
//!     listener.post_persist(&mut cycle, &mut host, &object)?;
//! }
//! host.primary_store().flush()?;                          // host's own write
//! let report = listener.post_flush(cycle)?;               // after the flush
//! ```
//!
//! All per-flush state lives in the returned [`FlushCycle`]; the listener
//! itself only holds configuration and the store registry, so it can be
//! shared across any number of cycles.

use loggable_entry::LogAction;
use loggable_store::StoreRegistry;

use crate::adapter::HostAdapter;
use crate::config::{AuditConfig, LoggableConfig};
use crate::cycle::{CycleReport, FlushCycle, Unresolved};
use crate::error::Result;
use crate::hook::{NoopHook, PrePersistHook};
use crate::identity::IdentitySource;
use crate::synthesizer::Synthesizer;
use crate::target::StoreAccess;

/// Records an audit trail for the objects a host flushes.
pub struct LoggableListener<A: HostAdapter> {
    config: LoggableConfig,
    registry: StoreRegistry,
    hook: Box<dyn PrePersistHook<A::Object>>,
}

impl<A: HostAdapter> LoggableListener<A> {
    pub fn new() -> Self {
        Self::with_config(LoggableConfig::default())
    }

    pub fn with_config(config: LoggableConfig) -> Self {
        Self {
            config,
            registry: StoreRegistry::new(),
            hook: Box::new(NoopHook),
        }
    }

    /// Build a listener and apply the config's store routes to `registry`.
    ///
    /// Fails if a route names a store the registry does not hold.
    pub fn from_config(config: LoggableConfig, mut registry: StoreRegistry) -> Result<Self> {
        for (log_entry_type, store_id) in &config.stores {
            registry.route(log_entry_type.clone(), store_id.as_str())?;
        }
        let mut listener = Self::with_config(config);
        listener.registry = registry;
        Ok(listener)
    }

    /// Set who is recorded on new entries.
    pub fn set_identity(&mut self, identity: impl Into<IdentitySource>) -> Result<()> {
        let name = identity.into().resolve()?;
        self.config.username = Some(name);
        Ok(())
    }

    pub fn username(&self) -> Option<&str> {
        self.config.username.as_deref()
    }

    /// Replace the store registry.
    pub fn set_store_registry(&mut self, registry: StoreRegistry) {
        self.registry = registry;
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StoreRegistry {
        &mut self.registry
    }

    /// Audit a type (replaces any earlier config for it).
    pub fn configure_type(&mut self, type_name: impl Into<String>, config: AuditConfig) {
        self.config.types.insert(type_name.into(), config);
    }

    pub fn config(&self) -> &LoggableConfig {
        &self.config
    }

    pub fn set_hook(&mut self, hook: impl PrePersistHook<A::Object> + 'static) {
        self.hook = Box::new(hook);
    }

    /// Begin a cycle: synthesize entries for every scheduled insertion,
    /// update, and deletion, in that order.
    ///
    /// If synthesis fails, the entries this call already staged in secondary
    /// stores are discarded before the error is returned. The host's own
    /// store is left to the host.
    pub fn on_flush(&mut self, adapter: &mut A) -> Result<FlushCycle<A::Object>> {
        let mut cycle = FlushCycle::new();

        let insertions = adapter.scheduled_insertions();
        let updates = adapter.scheduled_updates();
        let deletions = adapter.scheduled_deletions();
        for object in insertions.iter().chain(&updates).chain(&deletions) {
            cycle.arena.track(object);
        }

        let mut synthesizer = Synthesizer {
            types: &self.config.types,
            username: self.config.username.as_deref(),
            registry: &mut self.registry,
            hook: &mut *self.hook,
        };

        let scheduled = [
            (LogAction::Create, insertions),
            (LogAction::Update, updates),
            (LogAction::Remove, deletions),
        ];
        let mut scanned = Ok(());
        'scan: for (action, objects) in scheduled {
            for object in &objects {
                match synthesizer.synthesize(action, object, adapter, &mut cycle) {
                    Ok(entry) => cycle.record(entry),
                    Err(err) => {
                        scanned = Err(err);
                        break 'scan;
                    }
                }
            }
        }
        if let Err(err) = scanned {
            let dropped = cycle.pending_flush.discard_all(&mut self.registry);
            tracing::warn!(
                cycle = %cycle.cycle_id,
                dropped,
                error = %err,
                "flush scan failed, staged secondary entries discarded"
            );
            return Err(err);
        }

        tracing::debug!(
            cycle = %cycle.cycle_id,
            entries = cycle.entries.len(),
            skipped = cycle.skipped,
            "flush scanned"
        );
        Ok(cycle)
    }

    /// The host wrote `object`; fill in whatever was waiting for its id.
    pub fn post_persist(
        &mut self,
        cycle: &mut FlushCycle<A::Object>,
        adapter: &mut A,
        object: &A::Object,
    ) -> Result<()> {
        let Some(idx) = cycle.arena.lookup(object) else {
            return Ok(());
        };
        let Some(identifier) = adapter.identifier(object) else {
            tracing::warn!(cycle = %cycle.cycle_id, object = %idx, "inserted object still has no identifier");
            return Ok(());
        };

        let mut stores = StoreAccess::new(adapter.primary_store(), &mut self.registry);
        let touched = cycle.pending.resolve(idx, &identifier, &mut stores)?;
        for target in &touched {
            cycle.pending_flush.stage(target);
        }
        Ok(())
    }

    /// The host flush failed: drop every entry the cycle staged in
    /// secondary stores. The host discards its own store's staged work.
    pub fn abort(&mut self, mut cycle: FlushCycle<A::Object>) -> usize {
        let dropped = cycle.pending_flush.discard_all(&mut self.registry);
        tracing::warn!(cycle = %cycle.cycle_id, dropped, "flush cycle aborted");
        dropped
    }

    /// The host flush completed: flush staged secondary stores and close the
    /// cycle.
    pub fn post_flush(&mut self, mut cycle: FlushCycle<A::Object>) -> Result<CycleReport> {
        let flushed = cycle.pending_flush.flush_all(&mut self.registry)?;
        let report = cycle.into_report(flushed);

        for unresolved in &report.unresolved {
            match &unresolved.kind {
                Unresolved::ObjectId { object_class } => tracing::warn!(
                    entry = %unresolved.entry_id,
                    object_class = %object_class,
                    awaiting = %unresolved.awaiting,
                    "log entry left without object id"
                ),
                Unresolved::Relation { path } => tracing::warn!(
                    entry = %unresolved.entry_id,
                    field = %path.join("."),
                    awaiting = %unresolved.awaiting,
                    "log entry left with unresolved relation"
                ),
            }
        }

        tracing::info!(
            cycle = %report.cycle_id,
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            skipped = report.skipped,
            secondary_stores = report.stores_flushed.len(),
            unresolved = report.unresolved.len(),
            "flush cycle complete"
        );
        Ok(report)
    }
}

impl<A: HostAdapter> Default for LoggableListener<A> {
    fn default() -> Self {
        Self::new()
    }
}

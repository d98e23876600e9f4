//! Log-entry synthesis.
//!
//! Turns one scheduled insertion, update, or deletion into at most one
//! staged [`LogEntry`]:
//!
//! 1. skip embedded document types and unaudited types
//! 2. stamp action, username, class, and time
//! 3. set the object id now, or defer it until the post-insert signal
//! 4. project the audited data (updates with nothing audited are dropped)
//! 5. assign the version from the target store's history
//! 6. run the pre-persist hook, then stage the entry

use std::collections::BTreeMap;

use loggable_entry::{LogAction, LogEntry};
use loggable_store::StoreRegistry;

use crate::adapter::HostAdapter;
use crate::config::AuditConfig;
use crate::cycle::FlushCycle;
use crate::error::Result;
use crate::hook::PrePersistHook;
use crate::projector::{ProjectionOwner, Projector};
use crate::resolver::PendingInsert;
use crate::target::{StoreAccess, StoreTarget};

/// Everything synthesis reads from the listener.
pub struct Synthesizer<'a, O> {
    pub types: &'a BTreeMap<String, AuditConfig>,
    pub username: Option<&'a str>,
    pub registry: &'a mut StoreRegistry,
    pub hook: &'a mut dyn PrePersistHook<O>,
}

impl<'a, O> Synthesizer<'a, O> {
    /// Build, stage, and return the entry for `object`, or `None` if the
    /// action is not recorded.
    pub fn synthesize<A>(
        &mut self,
        action: LogAction,
        object: &O,
        adapter: &mut A,
        cycle: &mut FlushCycle<O>,
    ) -> Result<Option<LogEntry>>
    where
        A: HostAdapter<Object = O>,
        O: Clone + Eq + std::hash::Hash + std::fmt::Debug + 'static,
    {
        let meta = adapter.class_metadata(object);
        if meta.embedded_document {
            tracing::debug!(object_class = %meta.name, "embedded document skipped");
            return Ok(None);
        }
        let Some(config) = self.types.get(&meta.name) else {
            return Ok(None);
        };

        let log_entry_type = config
            .log_entry_type
            .clone()
            .unwrap_or_else(|| adapter.default_log_entry_type().to_string());
        let target = StoreTarget::for_log_entry_type(self.registry, &log_entry_type);

        let mut entry = LogEntry::new(action, meta.name.clone())
            .with_username(self.username.map(str::to_string));

        if action == LogAction::Create && adapter.is_post_insert_generator(&meta) {
            let idx = cycle.arena.track(object);
            cycle.pending.register_pending_insert(
                idx,
                PendingInsert {
                    entry_id: entry.id,
                    target: target.clone(),
                    object_class: meta.name.clone(),
                },
            );
        } else if let Some(id) = adapter.identifier(object) {
            entry = entry.with_object_id(&id);
        }

        if action != LogAction::Remove && !config.versioned.is_empty() {
            let owner = ProjectionOwner {
                entry_id: entry.id,
                target: target.clone(),
            };
            let change_set = adapter.object_change_set(object);
            let data = Projector::new(&*adapter, self.types).project(
                object,
                &change_set,
                config,
                &owner,
                cycle,
            );
            if action == LogAction::Update && data.is_empty() {
                tracing::debug!(object_class = %meta.name, "no audited change, update skipped");
                return Ok(None);
            }
            entry.data = Some(data);
        } else if action == LogAction::Update {
            return Ok(None);
        }

        let mut stores = StoreAccess::new(adapter.primary_store(), self.registry);
        let store = stores.store(&target)?;

        entry.version = match (action, entry.object_id.as_deref()) {
            (LogAction::Create, _) | (_, None) => 1,
            // No history means the type became audited after the object existed.
            (_, Some(object_id)) => store
                .max_version(&entry.object_class, object_id)?
                .map_or(1, |max| max + 1),
        };

        // Pending records already point at this id.
        let entry_id = entry.id;
        self.hook.pre_persist(&mut entry, object);
        entry.id = entry_id;

        store.persist(entry.clone())?;
        cycle.pending_flush.stage(&target);

        tracing::debug!(
            action = %entry.action,
            object_class = %entry.object_class,
            object_id = entry.object_id.as_deref().unwrap_or("<pending>"),
            version = entry.version,
            store = %target,
            "log entry staged"
        );

        Ok(Some(entry))
    }
}

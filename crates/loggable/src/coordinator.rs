//! Cross-store flush coordination.
//!
//! Log entries routed to a secondary store are only staged there while the
//! host flushes its own store. Once the host flush completes, every staged
//! secondary store is flushed exactly once, in the order it was first
//! staged.

use loggable_store::{StoreId, StoreRegistry};

use crate::error::Result;
use crate::target::StoreTarget;

/// Secondary stores that received writes during the current cycle.
#[derive(Debug, Default)]
pub struct PendingFlush {
    order: Vec<StoreId>,
}

impl PendingFlush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a target as needing a flush. The primary store is flushed by the
    /// host, so staging it is a no-op.
    pub fn stage(&mut self, target: &StoreTarget) {
        if let StoreTarget::Secondary(id) = target {
            if !self.order.contains(id) {
                self.order.push(id.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn staged(&self) -> &[StoreId] {
        &self.order
    }

    /// Take the staged stores, leaving the set empty.
    pub fn drain(&mut self) -> Vec<StoreId> {
        std::mem::take(&mut self.order)
    }

    /// Flush every staged store once and return them in flush order.
    ///
    /// The set is emptied before the first flush, so anything staged while
    /// draining lands in a fresh set instead of the one being drained. If a
    /// store fails, it and every store after it have their staged work
    /// discarded, and the first error is returned.
    pub fn flush_all(&mut self, registry: &mut StoreRegistry) -> Result<Vec<StoreId>> {
        let stores = self.drain();
        for (pos, id) in stores.iter().enumerate() {
            if let Err(err) = flush_one(registry, id) {
                let dropped = discard_each(registry, &stores[pos..]);
                tracing::warn!(store = %id, dropped, error = %err, "secondary store flush failed");
                return Err(err);
            }
        }
        Ok(stores)
    }

    /// Drop the staged work of every staged store without writing it.
    pub fn discard_all(&mut self, registry: &mut StoreRegistry) -> usize {
        let stores = self.drain();
        discard_each(registry, &stores)
    }
}

fn flush_one(registry: &mut StoreRegistry, id: &StoreId) -> Result<usize> {
    let store = registry.require_mut(id)?;
    let written = store.flush()?;
    tracing::debug!(store = %id, written, "secondary store flushed");
    Ok(written)
}

fn discard_each(registry: &mut StoreRegistry, ids: &[StoreId]) -> usize {
    let mut dropped = 0;
    for id in ids {
        if let Some(store) = registry.get_mut(id) {
            dropped += store.discard();
        }
    }
    dropped
}

// demo.rs — Run a sample entity lifecycle through the engine.
//
// Creates, updates, and removes one Article in the in-memory host, then
// prints the resulting history. With `--store` the entries are written to
// a JSONL or SQLite file that `history`, `revert`, and `verify` can read.

use std::collections::BTreeSet;
use std::path::Path;

use loggable::{AuditConfig, ClassMetadata, CycleReport, IdGenerator, LoggableConfig, LoggableListener};
use loggable_host_memory::{EntityManager, EntityRef};
use loggable_store::{LogEntryRepository, MemoryStore, StoreRegistry};

pub fn default_config() -> LoggableConfig {
    let mut config =
        LoggableConfig::default().with_type("Article", AuditConfig::versioned(["title", "body"]));
    config.username = Some("demo".to_string());
    config
}

pub fn execute(config: LoggableConfig, store: Option<&Path>) -> anyhow::Result<()> {
    let mut em = EntityManager::new();
    if let Some(path) = store {
        em = em.with_log_store(super::store::open(path)?);
    }
    let mut listener = listener_for(config)?;

    let (article, reports) = run_lifecycle(&mut em, &mut listener)?;
    for (step, report) in ["create", "update", "remove"].iter().zip(&reports) {
        println!(
            "{:<7} cycle {}: {} written, {} skipped",
            step,
            report.cycle_id,
            report.entries_written(),
            report.skipped
        );
    }

    let id = em
        .get(article, "id")
        .and_then(|field| field.as_value())
        .map(|value| value.to_string())
        .unwrap_or_default();
    println!();
    for entry in LogEntryRepository::new(em.log_store()).log_entries("Article", &id)? {
        println!(
            "v{} {:<7} {}",
            entry.version,
            entry.action.as_str(),
            serde_json::to_string(&entry.data)?
        );
    }
    Ok(())
}

/// Build a listener whose registry holds an in-memory store for every
/// store id the config routes to.
fn listener_for(config: LoggableConfig) -> anyhow::Result<LoggableListener<EntityManager>> {
    let store_ids: BTreeSet<&String> = config.stores.values().collect();
    let mut registry = StoreRegistry::new();
    for id in store_ids {
        registry.register(id.as_str(), Box::new(MemoryStore::new(id.clone())));
    }
    Ok(LoggableListener::from_config(config, registry)?)
}

fn run_lifecycle(
    em: &mut EntityManager,
    listener: &mut LoggableListener<EntityManager>,
) -> anyhow::Result<(EntityRef, Vec<CycleReport>)> {
    em.register_class(ClassMetadata::new("Article").with_id_generator(IdGenerator::PostInsert));

    let mut reports = Vec::new();
    let article = em.new_entity("Article")?;
    em.set(article, "title", "Title")?;
    em.set(article, "body", "Body")?;
    em.persist(article)?;
    reports.push(em.flush(listener)?);

    em.set(article, "title", "Title 2")?;
    reports.push(em.flush(listener)?);

    em.remove(article)?;
    reports.push(em.flush(listener)?);

    Ok((article, reports))
}

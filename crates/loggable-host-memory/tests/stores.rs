// stores.rs — Log entries routed to secondary stores.
//
// Mirrors a relational host logging some types into a separate document
// store: entries are staged there during the host flush and written once
// the flush completes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use loggable::{AuditConfig, ClassMetadata, IdGenerator, LoggableConfig, LoggableListener};
use loggable_entry::{EntryPatch, LogEntry};
use loggable_host_memory::EntityManager;
use loggable_store::{
    JsonlStore, LogStore, MemoryStore, SqliteStore, StoreError, StoreId, StoreRegistry,
};
use serde_json::json;
use tempfile::tempdir;
use uuid::Uuid;

/// A MemoryStore that counts its flushes.
struct CountingStore {
    inner: MemoryStore,
    flushes: Arc<AtomicUsize>,
}

impl LogStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn persist(&mut self, entry: LogEntry) -> Result<(), StoreError> {
        self.inner.persist(entry)
    }
    fn schedule_extra_update(&mut self, entry_id: Uuid, patch: EntryPatch) -> Result<(), StoreError> {
        self.inner.schedule_extra_update(entry_id, patch)
    }
    fn flush(&mut self) -> Result<usize, StoreError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush()
    }
    fn max_version(&self, object_class: &str, object_id: &str) -> Result<Option<u32>, StoreError> {
        self.inner.max_version(object_class, object_id)
    }
    fn find(&self, entry_id: Uuid) -> Result<Option<LogEntry>, StoreError> {
        self.inner.find(entry_id)
    }
    fn entries_for(&self, object_class: &str, object_id: &str) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.entries_for(object_class, object_id)
    }
    fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }
    fn discard(&mut self) -> usize {
        self.inner.discard()
    }
}

fn page_manager() -> EntityManager {
    let mut em = EntityManager::new();
    em.register_class(
        ClassMetadata::new("Page")
            .with_id_generator(IdGenerator::PostInsert)
            .with_reference("parent"),
    );
    em.register_class(ClassMetadata::new("Article").with_id_generator(IdGenerator::PostInsert));
    em
}

fn page_config() -> LoggableConfig {
    LoggableConfig::from_toml_str(
        r#"
        username = "jules"

        [types.Page]
        versioned = ["title", "parent"]
        log_entry_type = "PageRevision"

        [types.Article]
        versioned = ["title"]

        [stores]
        PageRevision = "documents"
        "#,
    )
    .unwrap()
}

#[test]
fn secondary_store_is_flushed_once_per_cycle() {
    let flushes = Arc::new(AtomicUsize::new(0));
    let mut registry = StoreRegistry::new();
    registry.register(
        "documents",
        Box::new(CountingStore {
            inner: MemoryStore::new("documents"),
            flushes: Arc::clone(&flushes),
        }),
    );
    let mut listener = LoggableListener::from_config(page_config(), registry).unwrap();

    let mut em = page_manager();
    let parent = em.new_entity("Page").unwrap();
    em.set(parent, "title", "Parent").unwrap();
    let child = em.new_entity("Page").unwrap();
    em.set(child, "title", "Child").unwrap();
    em.set_ref(child, "parent", parent).unwrap();
    em.persist(child).unwrap();
    em.persist(parent).unwrap();
    let article = em.new_entity("Article").unwrap();
    em.set(article, "title", "Title").unwrap();
    em.persist(article).unwrap();

    let report = em.flush(&mut listener).unwrap();
    assert_eq!(report.created, 3);
    assert!(report.is_complete());
    assert_eq!(report.stores_flushed, vec![StoreId::new("documents")]);
    assert_eq!(flushes.load(Ordering::SeqCst), 1);

    // Page revisions never touch the host's own log store.
    assert_eq!(em.log_store().entries_for("Article", "1").unwrap().len(), 1);
    assert!(em.log_store().entries_for("Page", "1").unwrap().is_empty());

    let docs = listener.registry().get(&StoreId::new("documents")).unwrap();
    assert_eq!(docs.pending_count(), 0);
    let child_entry = &docs.entries_for("Page", "1").unwrap()[0];
    assert_eq!(child_entry.data.as_ref().unwrap()["parent"], json!(2));

    // A cycle with nothing routed to the secondary store leaves it alone.
    em.set(article, "title", "Title 2").unwrap();
    let report = em.flush(&mut listener).unwrap();
    assert!(report.stores_flushed.is_empty());
    assert_eq!(flushes.load(Ordering::SeqCst), 1);
}

#[test]
fn jsonl_secondary_keeps_chain_and_versions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("revisions.jsonl");

    {
        let registry = StoreRegistry::new()
            .with_store("PageRevision", "documents", Box::new(JsonlStore::open(&path).unwrap()));
        let mut listener = LoggableListener::from_config(page_config(), registry).unwrap();
        let mut em = page_manager();

        let page = em.new_entity("Page").unwrap();
        em.set(page, "title", "Title").unwrap();
        em.persist(page).unwrap();
        em.flush(&mut listener).unwrap();

        em.set(page, "title", "Title 2").unwrap();
        em.flush(&mut listener).unwrap();
    }

    assert!(JsonlStore::verify_chain(&path).unwrap());

    let reopened = JsonlStore::open(&path).unwrap();
    let entries = reopened.entries_for("Page", "1").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].version, 2);
    assert_eq!(entries[1].object_id.as_deref(), Some("1"));
}

#[test]
fn sqlite_secondary_records_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.db");

    let registry = StoreRegistry::new().with_store(
        "PageRevision",
        "documents",
        Box::new(SqliteStore::open(&path).unwrap()),
    );
    let mut listener = LoggableListener::from_config(page_config(), registry).unwrap();
    let mut em = page_manager();

    let page = em.new_entity("Page").unwrap();
    em.set(page, "title", "Title").unwrap();
    em.persist(page).unwrap();
    em.flush(&mut listener).unwrap();

    em.remove(page).unwrap();
    em.flush(&mut listener).unwrap();

    let store = SqliteStore::open(&path).unwrap();
    let entries = store.entries_for("Page", "1").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].version, 2);
    assert_eq!(entries[0].data, None);
    assert_eq!(
        entries[1].data,
        json!({"title": "Title"}).as_object().cloned()
    );
}

#[test]
fn routing_to_secondary_is_configurable_in_code() {
    let mut listener: LoggableListener<EntityManager> = LoggableListener::new();
    listener.configure_type(
        "Article",
        AuditConfig::versioned(["title"]).with_log_entry_type("ArticleLog"),
    );
    listener
        .registry_mut()
        .register("archive", Box::new(MemoryStore::new("archive")));
    listener.registry_mut().route("ArticleLog", "archive").unwrap();

    let mut em = page_manager();
    let article = em.new_entity("Article").unwrap();
    em.set(article, "title", "Title").unwrap();
    em.persist(article).unwrap();

    let report = em.flush(&mut listener).unwrap();
    assert_eq!(report.stores_flushed, vec![StoreId::new("archive")]);
    let archive = listener.registry().get(&StoreId::new("archive")).unwrap();
    assert_eq!(archive.entries_for("Article", "1").unwrap().len(), 1);
}

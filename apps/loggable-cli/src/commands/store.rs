// store.rs — Open a log store from a path, picking the backend by extension.

use std::path::Path;

use loggable_store::{JsonlStore, LogStore, SqliteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Jsonl,
    Sqlite,
}

impl StoreKind {
    pub fn for_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") => Ok(StoreKind::Jsonl),
            Some("db" | "sqlite" | "sqlite3") => Ok(StoreKind::Sqlite),
            _ => anyhow::bail!(
                "cannot tell the store type of {} (expected .jsonl, .db, .sqlite or .sqlite3)",
                path.display()
            ),
        }
    }
}

pub fn open(path: &Path) -> anyhow::Result<Box<dyn LogStore>> {
    let store: Box<dyn LogStore> = match StoreKind::for_path(path)? {
        StoreKind::Jsonl => Box::new(JsonlStore::open(path)?),
        StoreKind::Sqlite => Box::new(SqliteStore::open(path)?),
    };
    tracing::debug!(path = %path.display(), store = store.name(), "opened log store");
    Ok(store)
}

/// Like `open`, but a missing file is an error instead of an empty store.
pub fn open_existing(path: &Path) -> anyhow::Result<Box<dyn LogStore>> {
    if !path.exists() {
        anyhow::bail!("no log store found at {}", path.display());
    }
    open(path)
}

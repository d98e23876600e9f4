// repository.rs — Read-side queries over a LogStore.
//
// History listing and point-in-time reconstruction of an object's audited
// fields from its log entries.

use loggable_entry::{LogData, LogEntry};

use crate::error::StoreError;
use crate::store::LogStore;

/// Read-only view of the log entries held by one store.
pub struct LogEntryRepository<'a> {
    store: &'a dyn LogStore,
}

impl<'a> LogEntryRepository<'a> {
    pub fn new(store: &'a dyn LogStore) -> Self {
        Self { store }
    }

    /// All written entries for an object, newest version first.
    pub fn log_entries(
        &self,
        object_class: &str,
        object_id: &str,
    ) -> Result<Vec<LogEntry>, StoreError> {
        self.store.entries_for(object_class, object_id)
    }

    /// The audited field state of an object as of `version`.
    ///
    /// Folds the data of every entry up to and including `version`, oldest
    /// first, so each field holds its most recently recorded value. Remove
    /// entries carry no data and contribute nothing.
    pub fn revert_data(
        &self,
        object_class: &str,
        object_id: &str,
        version: u32,
    ) -> Result<LogData, StoreError> {
        let mut entries = self.store.entries_for(object_class, object_id)?;
        if !entries.iter().any(|e| e.version == version) {
            return Err(StoreError::VersionNotFound {
                object_class: object_class.to_string(),
                object_id: object_id.to_string(),
                version,
            });
        }

        entries.retain(|e| e.version <= version);
        entries.sort_by_key(|e| e.version);

        let mut state = LogData::new();
        for entry in entries {
            if let Some(data) = entry.data {
                for (field, value) in data {
                    state.insert(field, value);
                }
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use loggable_entry::{Identifier, LogAction};
    use serde_json::json;

    fn entry(action: LogAction, version: u32, fields: &[(&str, serde_json::Value)]) -> LogEntry {
        let entry = LogEntry::new(action, "Article")
            .with_object_id(&Identifier::from(1i64))
            .with_version(version);
        if action == LogAction::Remove {
            return entry;
        }
        let mut data = LogData::new();
        for (name, value) in fields {
            data.insert(name.to_string(), value.clone());
        }
        entry.with_data(data)
    }

    fn article_history() -> MemoryStore {
        let mut store = MemoryStore::new("memory");
        store
            .persist(entry(
                LogAction::Create,
                1,
                &[("title", json!("Title")), ("body", json!("Body"))],
            ))
            .unwrap();
        store
            .persist(entry(LogAction::Update, 2, &[("title", json!("New"))]))
            .unwrap();
        store
            .persist(entry(LogAction::Update, 3, &[("body", json!("Rewritten"))]))
            .unwrap();
        store.persist(entry(LogAction::Remove, 4, &[])).unwrap();
        store.flush().unwrap();
        store
    }

    #[test]
    fn revert_to_initial_version() {
        let store = article_history();
        let repo = LogEntryRepository::new(&store);
        let state = repo.revert_data("Article", "1", 1).unwrap();
        assert_eq!(state["title"], json!("Title"));
        assert_eq!(state["body"], json!("Body"));
    }

    #[test]
    fn revert_combines_partial_updates() {
        let store = article_history();
        let repo = LogEntryRepository::new(&store);
        let state = repo.revert_data("Article", "1", 3).unwrap();
        assert_eq!(state["title"], json!("New"));
        assert_eq!(state["body"], json!("Rewritten"));

        // The remove entry adds nothing.
        assert_eq!(repo.revert_data("Article", "1", 4).unwrap(), state);
    }

    #[test]
    fn revert_to_missing_version_fails() {
        let store = article_history();
        let repo = LogEntryRepository::new(&store);
        let result = repo.revert_data("Article", "1", 9);
        assert!(matches!(
            result,
            Err(StoreError::VersionNotFound { version: 9, .. })
        ));
    }

    #[test]
    fn log_entries_newest_first() {
        let store = article_history();
        let repo = LogEntryRepository::new(&store);
        let entries = repo.log_entries("Article", "1").unwrap();
        assert_eq!(entries.first().unwrap().action, LogAction::Remove);
        assert_eq!(entries.last().unwrap().version, 1);
    }
}

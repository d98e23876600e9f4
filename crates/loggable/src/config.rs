//! Engine configuration.
//!
//! Which types are audited, which of their fields are versioned, which
//! log-entry type records them, and which store each log-entry type lives
//! in. Normally built in code; can also be loaded from a TOML file:
//!
//! ```toml
//! username = "jules"
//!
//! [types.Article]
//! versioned = ["title", "author"]
//!
//! [types.Page]
//! versioned = ["title"]
//! log_entry_type = "PageRevision"
//!
//! [stores]
//! PageRevision = "documents"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoggableError, Result};

/// Audit configuration for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Fields whose values are recorded in `LogEntry::data`.
    #[serde(default)]
    pub versioned: BTreeSet<String>,

    /// Log-entry type for this entity (defaults to the adapter's default).
    #[serde(default)]
    pub log_entry_type: Option<String>,
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit the given fields.
    pub fn versioned<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versioned: fields.into_iter().map(Into::into).collect(),
            log_entry_type: None,
        }
    }

    /// Set the log-entry type and return self (builder pattern).
    pub fn with_log_entry_type(mut self, log_entry_type: impl Into<String>) -> Self {
        self.log_entry_type = Some(log_entry_type.into());
        self
    }

    pub fn is_versioned(&self, field: &str) -> bool {
        self.versioned.contains(field)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggableConfig {
    /// Identity recorded on every entry.
    #[serde(default)]
    pub username: Option<String>,

    /// Audited types by type name. Unlisted types are not audited.
    #[serde(default)]
    pub types: BTreeMap<String, AuditConfig>,

    /// Log-entry type to registry store id.
    #[serde(default)]
    pub stores: BTreeMap<String, String>,
}

impl LoggableConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LoggableError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Try to load config, returning default if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Add an audited type and return self (builder pattern).
    pub fn with_type(mut self, type_name: impl Into<String>, config: AuditConfig) -> Self {
        self.types.insert(type_name.into(), config);
        self
    }

    pub fn audit_config(&self, type_name: &str) -> Option<&AuditConfig> {
        self.types.get(type_name)
    }
}

// entry.rs — LogEntry data model.
//
// Every audited create, update, or remove of an entity is recorded as a
// LogEntry. Entries are versioned per (object_class, object_id): the first
// entry for an object is version 1 and each recorded action adds one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifier::Identifier;
use crate::patch::EntryPatch;

/// The recorded field state: field name to recorded value.
pub type LogData = serde_json::Map<String, serde_json::Value>;

/// What kind of change this entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    /// The entity was inserted.
    Create,
    /// One or more audited fields of the entity changed.
    Update,
    /// The entity was deleted.
    Remove,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Create => "create",
            LogAction::Update => "update",
            LogAction::Remove => "remove",
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(LogAction::Create),
            "update" => Ok(LogAction::Update),
            "remove" => Ok(LogAction::Remove),
            other => Err(format!("unknown log action: {other}")),
        }
    }
}

/// A single audit record.
///
/// `object_id` is `None` only between synthesis and the post-insert signal
/// of a create whose identifier is generated by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Store-side handle for this entry (used to address in-place updates).
    pub id: Uuid,

    /// What kind of change was recorded.
    pub action: LogAction,

    /// Who made the change, if an identity was configured.
    pub username: Option<String>,

    /// Type name of the audited entity.
    pub object_class: String,

    /// Identifier of the audited entity.
    pub object_id: Option<String>,

    /// Monotonic per `(object_class, object_id)`, starting at 1.
    pub version: u32,

    /// When the change was recorded (UTC).
    pub logged_at: DateTime<Utc>,

    /// Recorded field values. `None` for remove actions.
    #[serde(default)]
    pub data: Option<LogData>,
}

impl LogEntry {
    /// Create a new entry stamped with the current time.
    ///
    /// The version starts at 1; callers assign the real version once the
    /// prior history is known.
    pub fn new(action: LogAction, object_class: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            username: None,
            object_class: object_class.into(),
            object_id: None,
            version: 1,
            logged_at: Utc::now(),
            data: None,
        }
    }

    /// Set the username and return self (builder pattern).
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Set the object identifier and return self.
    pub fn with_object_id(mut self, id: &Identifier) -> Self {
        self.object_id = Some(id.to_object_id());
        self
    }

    /// Set the version and return self.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the recorded data and return self.
    pub fn with_data(mut self, data: LogData) -> Self {
        self.data = Some(data);
        self
    }

    /// Apply an in-place field patch.
    pub fn apply(&mut self, patch: &EntryPatch) {
        match patch {
            EntryPatch::ObjectId { new, .. } => self.object_id = Some(new.clone()),
            EntryPatch::Data { new, .. } => self.data = Some(new.clone()),
        }
    }

    /// True when the entry still lacks an object identifier.
    pub fn is_pending_identifier(&self) -> bool {
        self.object_id.is_none()
    }
}

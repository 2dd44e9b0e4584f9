//! AuditEntry: a single hash-chained audit log entry.
//!
//! Callers describe what happened with a [`NewAuditEntry`]; the log stamps
//! the time, the acting user, a sequence number, and links the entry to its
//! predecessor via `prev_hash`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// What kind of change an entry records.
///
/// The four CRUD verbs serialize as their lowercase names; anything else is
/// a free-form tag such as `"lock_record"` or `"export"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Custom(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Read => "read",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Custom(tag) => tag,
        }
    }

    pub fn custom(tag: impl Into<String>) -> Self {
        AuditAction::from(tag.into())
    }
}

impl From<String> for AuditAction {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "create" => AuditAction::Create,
            "read" => AuditAction::Read,
            "update" => AuditAction::Update,
            "delete" => AuditAction::Delete,
            _ => AuditAction::Custom(tag),
        }
    }
}

impl From<&str> for AuditAction {
    fn from(tag: &str) -> Self {
        AuditAction::from(tag.to_string())
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuditAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(AuditAction::from(String::deserialize(deserializer)?))
    }
}

/// One field's before/after values within a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// The caller-supplied part of an entry: everything except the timestamp,
/// the acting user, and the chain fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub changes: Option<Vec<FieldChange>>,
    pub metadata: Option<Value>,
}

impl NewAuditEntry {
    pub fn new(action: impl Into<AuditAction>, entity_type: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            changes: None,
            metadata: None,
        }
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn change(mut self, change: FieldChange) -> Self {
        self.changes.get_or_insert_with(Vec::new).push(change);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A single entry in the bounded audit log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    /// Position in the log since creation; keeps counting across evictions.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
    pub changes: Option<Vec<FieldChange>>,
    pub metadata: Option<Value>,
    pub prev_hash: String,
    pub entry_hash: String,
}

impl AuditEntry {
    /// Stamp a draft with the current time and the acting user, and chain it
    /// to `prev_hash`.
    pub fn new(
        draft: NewAuditEntry,
        user_id: Option<&str>,
        sequence: u64,
        prev_hash: String,
    ) -> Self {
        let mut entry = Self {
            entry_id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            action: draft.action,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            user_id: user_id.map(str::to_string),
            changes: draft.changes,
            metadata: draft.metadata,
            prev_hash,
            entry_hash: String::new(),
        };
        entry.entry_hash = entry.recompute_hash();
        entry
    }

    /// Recompute this entry's hash from its fields.
    ///
    /// Compare against `self.entry_hash` to detect tampering.
    pub fn recompute_hash(&self) -> String {
        let changes = self
            .changes
            .as_ref()
            .and_then(|c| serde_json::to_string(c).ok())
            .unwrap_or_default();
        let metadata = self
            .metadata
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();

        compute_hash(&[
            self.entry_id.to_string().as_str(),
            self.sequence.to_string().as_str(),
            self.timestamp.to_rfc3339().as_str(),
            self.action.as_str(),
            &self.entity_type,
            self.entity_id.as_deref().unwrap_or(""),
            self.user_id.as_deref().unwrap_or(""),
            &changes,
            &metadata,
            &self.prev_hash,
        ])
    }

    /// True if `field` appears in this entry's change list.
    pub fn touches_field(&self, field: &str) -> bool {
        self.changes
            .as_ref()
            .is_some_and(|changes| changes.iter().any(|c| c.field == field))
    }
}

/// SHA-256 over the fields, each followed by a unit separator so adjacent
/// fields cannot be shifted into each other.
pub(crate) fn compute_hash(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}

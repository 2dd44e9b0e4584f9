use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// The outcome of a modification check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    /// The field may be written.
    Allow,
    /// The field is immutable, the record is locked, or a required reason is missing.
    Deny,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "Allow"),
            Decision::Deny => write!(f, "Deny"),
        }
    }
}

/// A modification verdict linking a field (and optionally a record) to a decision.
///
/// Produced by `AccessPolicy::evaluate_modification()` so callers can show
/// the user why a change was rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    /// Human-readable explanation of the decision.
    pub reason: String,
    pub field: String,
    pub record_id: Option<RecordId>,
}

impl Verdict {
    pub fn allow(field: impl Into<String>, record_id: Option<RecordId>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: "modification permitted".to_string(),
            field: field.into(),
            record_id,
        }
    }

    pub fn deny(
        field: impl Into<String>,
        record_id: Option<RecordId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            decision: Decision::Deny,
            reason: reason.into(),
            field: field.into(),
            record_id,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }
}

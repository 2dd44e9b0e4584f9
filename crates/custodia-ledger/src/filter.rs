//! Composable filter for audit log queries.
//!
//! All criteria are AND-combined. Each `Some` field adds a condition;
//! `None` fields are ignored.

use chrono::{DateTime, Utc};

use crate::entry::{AuditAction, AuditEntry};

/// A composable filter for querying the audit log.
///
/// Use `Default::default()` for an empty filter (matches everything),
/// then set individual fields to narrow results.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    /// Only entries at or after this timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Only entries at or before this timestamp.
    pub to: Option<DateTime<Utc>>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// Only entries attributed to this user.
    pub user_id: Option<String>,
    /// Only entries whose change list touches this field.
    pub field: Option<String>,
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
    /// Number of matching entries to skip (for pagination).
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// Whether `entry` satisfies every criterion (limit/offset aside).
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self.from.is_some_and(|from| entry.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.timestamp > to) {
            return false;
        }
        if self.action.as_ref().is_some_and(|a| *a != entry.action) {
            return false;
        }
        if self
            .entity_type
            .as_deref()
            .is_some_and(|t| t != entry.entity_type)
        {
            return false;
        }
        if self
            .entity_id
            .as_deref()
            .is_some_and(|id| entry.entity_id.as_deref() != Some(id))
        {
            return false;
        }
        if self
            .user_id
            .as_deref()
            .is_some_and(|u| entry.user_id.as_deref() != Some(u))
        {
            return false;
        }
        if self
            .field
            .as_deref()
            .is_some_and(|f| !entry.touches_field(f))
        {
            return false;
        }
        true
    }

    /// Apply the filter, then offset and limit, to entries in log order.
    pub fn apply<'a, I>(&self, entries: I) -> Vec<AuditEntry>
    where
        I: IntoIterator<Item = &'a AuditEntry>,
    {
        entries
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

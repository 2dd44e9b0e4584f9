/// Query interface for audit records.
use crate::entry::AuditEntry;
use crate::filter::AuditFilter;
use crate::store::AuditLog;

impl AuditLog {
    /// Entries for `entity_id` (exact match), or the whole window when
    /// `None`, oldest first.
    pub fn query(&self, entity_id: Option<&str>) -> Vec<AuditEntry> {
        match entity_id {
            Some(id) => self
                .iter()
                .filter(|e| e.entity_id.as_deref() == Some(id))
                .cloned()
                .collect(),
            None => self.iter().cloned().collect(),
        }
    }

    /// Entries matching `filter`, oldest first, with offset/limit applied.
    pub fn query_filtered(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        filter.apply(self.iter())
    }

    /// The last `n` entries, most recent first.
    pub fn query_last(&self, n: usize) -> Vec<AuditEntry> {
        self.iter().rev().take(n).cloned().collect()
    }

    /// All retained entries attributed to `user_id`, oldest first.
    pub fn query_by_user(&self, user_id: &str) -> Vec<AuditEntry> {
        self.iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect()
    }
}

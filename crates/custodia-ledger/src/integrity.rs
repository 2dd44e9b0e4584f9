//! Result type for hash-chain verification.

use std::fmt;

/// Outcome of [`AuditLog::verify_integrity`](crate::AuditLog::verify_integrity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Entries inspected (the retained window, not everything ever appended).
    pub total_entries: usize,
    pub valid: bool,
    /// Position within the retained window of the first bad entry.
    pub first_invalid_entry: Option<usize>,
    pub message: String,
}

impl IntegrityReport {
    pub(crate) fn intact(total_entries: usize, message: impl Into<String>) -> Self {
        Self {
            total_entries,
            valid: true,
            first_invalid_entry: None,
            message: message.into(),
        }
    }

    pub(crate) fn broken(total_entries: usize, index: usize, message: impl Into<String>) -> Self {
        Self {
            total_entries,
            valid: false,
            first_invalid_entry: Some(index),
            message: message.into(),
        }
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.valid { "ok" } else { "BROKEN" };
        write!(f, "[{status}] {} entries: {}", self.total_entries, self.message)
    }
}

//! Audit middleware for extensible audit processing.
//!
//! An [`AuditMiddleware`] is invoked after every entry is appended, and
//! again when an entry falls out of the bounded window. Middleware receives
//! an immutable reference and cannot modify the trail.

use crate::entry::AuditEntry;

/// A hook invoked after an audit entry is appended.
///
/// Middleware runs synchronously inside the append. A panicking middleware
/// will propagate the panic; implementations should catch errors
/// internally and log them.
pub trait AuditMiddleware: Send + Sync {
    /// Called after an entry is appended to the log.
    fn on_entry(&self, entry: &AuditEntry);

    /// Called when an entry is evicted to keep the log within capacity.
    ///
    /// Default implementation does nothing.
    fn on_evict(&self, _entry: &AuditEntry) {}
}

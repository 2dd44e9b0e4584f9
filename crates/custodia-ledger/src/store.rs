//! AuditLog: bounded, append-only, hash-chained in-memory audit ledger.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::entry::{AuditEntry, NewAuditEntry};
use crate::integrity::IntegrityReport;
use crate::middleware::AuditMiddleware;

/// The sentinel value used as prev_hash for the very first entry.
pub const GENESIS_HASH: &str = "genesis";

/// Number of most recent entries a log retains.
pub const MAX_AUDIT_ENTRIES: usize = 1000;

/// A sliding window over the most recent audit entries.
///
/// Appends go to the tail; once the window is full the oldest entries are
/// dropped from the head. Evicted entries are gone unless a middleware
/// (such as [`NdjsonSink`](crate::NdjsonSink)) exported them.
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
    latest_hash: String,
    next_sequence: u64,
    evicted: u64,
    middleware: Vec<Arc<dyn AuditMiddleware>>,
}

impl AuditLog {
    /// An empty log holding up to [`MAX_AUDIT_ENTRIES`] entries.
    pub fn new() -> Self {
        Self::with_capacity(MAX_AUDIT_ENTRIES)
    }

    /// An empty log with a custom window size (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_AUDIT_ENTRIES)),
            capacity,
            latest_hash: GENESIS_HASH.to_string(),
            next_sequence: 0,
            evicted: 0,
            middleware: Vec::new(),
        }
    }

    /// Register a hook called after every append and eviction.
    pub fn add_middleware(&mut self, middleware: Arc<dyn AuditMiddleware>) {
        self.middleware.push(middleware);
    }

    /// Append an entry attributed to `user_id`.
    ///
    /// The timestamp and user are stamped here, never taken from the
    /// caller's draft. Returns a copy of the stored entry.
    pub fn append(&mut self, draft: NewAuditEntry, user_id: Option<&str>) -> AuditEntry {
        let entry = AuditEntry::new(
            draft,
            user_id,
            self.next_sequence,
            self.latest_hash.clone(),
        );
        self.next_sequence += 1;
        self.latest_hash = entry.entry_hash.clone();
        self.entries.push_back(entry.clone());

        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                self.evicted += 1;
                debug!(sequence = old.sequence, "audit entry evicted");
                for m in &self.middleware {
                    m.on_evict(&old);
                }
            }
        }

        for m in &self.middleware {
            m.on_entry(&entry);
        }
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries appended since creation, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.next_sequence
    }

    /// Entries dropped from the head to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AuditEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Hash of the newest entry, or [`GENESIS_HASH`] for an empty log.
    pub fn latest_hash(&self) -> &str {
        &self.latest_hash
    }

    /// Verify the hash chain over the retained window.
    ///
    /// Checks that each entry's hash matches its recomputed value and that
    /// each `prev_hash` equals the preceding entry's hash. Before any
    /// eviction the first entry must link to [`GENESIS_HASH`]; afterwards
    /// the first retained `prev_hash` is taken as the anchor.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let total = self.entries.len();
        if total == 0 {
            return IntegrityReport::intact(0, "audit log is empty");
        }

        let mut expected_prev = match self.evicted {
            0 => Some(GENESIS_HASH.to_string()),
            _ => None,
        };

        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(expected) = &expected_prev {
                if entry.prev_hash != *expected {
                    let report = IntegrityReport::broken(
                        total,
                        i,
                        format!(
                            "chain broken at entry {i}: expected prev_hash '{expected}', found '{}'",
                            entry.prev_hash
                        ),
                    );
                    warn!(%report, "audit chain verification failed");
                    return report;
                }
            }
            if entry.recompute_hash() != entry.entry_hash {
                let report = IntegrityReport::broken(
                    total,
                    i,
                    format!("entry {i} (sequence {}) hash mismatch", entry.sequence),
                );
                warn!(%report, "audit chain verification failed");
                return report;
            }
            expected_prev = Some(entry.entry_hash.clone());
        }

        IntegrityReport::intact(total, format!("all {total} retained entries verified"))
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted)
            .field("latest_hash", &self.latest_hash)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

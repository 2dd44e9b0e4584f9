//! Thread-safe handle around a [`ComplianceStore`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::container::ComplianceStore;

/// A cloneable, lock-protected store for multi-threaded hosts.
///
/// Every closure passed to [`with`](Self::with) runs under a single lock
/// acquisition, so a mutation and the audit entries it appends can never
/// interleave with another thread's.
pub struct SharedComplianceStore<S> {
    inner: Arc<Mutex<ComplianceStore<S>>>,
}

impl<S> SharedComplianceStore<S> {
    pub fn new(store: ComplianceStore<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ComplianceStore<S>> {
        // A panicking listener must not make the audit log unreachable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("compliance store lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut ComplianceStore<S>) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Run `f` with shared access to the store.
    pub fn read<R>(&self, f: impl FnOnce(&ComplianceStore<S>) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }
}

impl<S> Clone for SharedComplianceStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> From<ComplianceStore<S>> for SharedComplianceStore<S> {
    fn from(store: ComplianceStore<S>) -> Self {
        Self::new(store)
    }
}

impl<S> fmt::Debug for SharedComplianceStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedComplianceStore")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_ledger::{AuditAction, NewAuditEntry};
    use custodia_types::UserContext;
    use std::thread;

    #[test]
    fn concurrent_writes_keep_the_chain_intact() {
        let shared = SharedComplianceStore::new(ComplianceStore::new(Vec::<u32>::new()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        store.with(|s| {
                            s.set(|v| v.push(t * 100 + i));
                            s.add_audit_log(
                                NewAuditEntry::new(AuditAction::Create, "item")
                                    .entity(format!("item-{t}-{i}")),
                            );
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        shared.read(|s| {
            assert_eq!(s.state().len(), 100);
            assert_eq!(s.audit_log().len(), 200);
            assert!(s.audit_log().verify_integrity().valid);

            // Each domain entry directly follows the state write it describes.
            let entries = s.audit_entries(None);
            for pair in entries.chunks(2) {
                assert_eq!(pair[0].action, AuditAction::Update);
                assert_eq!(pair[1].action, AuditAction::Create);
            }
        });
    }

    #[test]
    fn survives_a_panicking_closure() {
        let shared = SharedComplianceStore::new(ComplianceStore::new(0u8));
        let clone = shared.clone();
        let result = thread::spawn(move || {
            clone.with(|_| panic!("boom"));
        })
        .join();
        assert!(result.is_err());

        shared.with(|s| s.set_user_context(Some(UserContext::new("after-panic"))));
        assert_eq!(
            shared.read(|s| s.user_context().map(|u| u.user_id.clone())),
            Some("after-panic".to_string())
        );
    }
}

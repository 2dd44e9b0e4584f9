//! ComplianceStore: a domain state value wrapped with compliance controls.
//!
//! Domain code reads state through [`ComplianceStore::state`] and writes it
//! through [`ComplianceStore::set`] or [`ComplianceStore::replace`]. Every
//! write is recorded in the store's audit log, announced to subscribers,
//! and mirrored to the persistence adapter (allow-listed keys only).

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use custodia_ledger::{AuditAction, AuditEntry, AuditLog, AuditMiddleware, NewAuditEntry};
use custodia_types::{
    ComplianceConfig, CustodiaError, ImmutabilityConfig, RecordId, RedactionConfig, UserContext,
    Verdict, COMPLIANCE_STATE_KEY,
};

use crate::compliance::ComplianceState;
use crate::persist::{select_persisted, PersistenceAdapter};

/// `entity_type` of the implicit entries appended for state writes.
pub const STATE_ENTITY_TYPE: &str = "state";

/// `entity_type` of lock/unlock entries.
const RECORD_ENTITY_TYPE: &str = "record";

/// Handle returned by [`ComplianceStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<S> = Box<dyn Fn(&S) + Send + Sync>;

/// Domain state plus the compliance sub-state that guards it.
pub struct ComplianceStore<S> {
    state: S,
    compliance: ComplianceState,
    persist_keys: Vec<String>,
    persistence: Option<Box<dyn PersistenceAdapter>>,
    listeners: Vec<(SubscriptionId, Listener<S>)>,
    next_listener: u64,
}

impl<S> ComplianceStore<S> {
    /// A store with redaction disabled, default immutability and no
    /// persistence.
    pub fn new(state: S) -> Self {
        Self::assemble(state, ComplianceState::new(), Vec::new(), None)
    }

    /// A store configured from `config`, which is validated first.
    pub fn with_config(state: S, config: ComplianceConfig) -> Result<Self, CustodiaError> {
        config.validate()?;
        Ok(Self::assemble(
            state,
            ComplianceState::from_config(&config),
            config.persist_keys,
            None,
        ))
    }

    fn assemble(
        state: S,
        compliance: ComplianceState,
        persist_keys: Vec<String>,
        persistence: Option<Box<dyn PersistenceAdapter>>,
    ) -> Self {
        info!(
            redaction = compliance.redaction.enabled,
            sensitive_fields = compliance.redaction.sensitive_fields.len(),
            immutable_fields = compliance.immutability.immutable_fields.len(),
            persist_keys = persist_keys.len(),
            persistence = persistence.is_some(),
            "compliance store created"
        );
        Self {
            state,
            compliance,
            persist_keys,
            persistence,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn compliance(&self) -> &ComplianceState {
        &self.compliance
    }

    pub fn persist_keys(&self) -> &[String] {
        &self.persist_keys
    }

    // -- user context ------------------------------------------------------

    /// Replace the acting user. `None` clears it.
    pub fn set_user_context(&mut self, context: Option<UserContext>) {
        self.compliance.set_user_context(context);
    }

    pub fn user_context(&self) -> Option<&UserContext> {
        self.compliance.user_context()
    }

    // -- policy ------------------------------------------------------------

    pub fn can_view_field(&self, field: &str) -> bool {
        self.compliance.can_view_field(field)
    }

    pub fn can_modify_field(&self, field: &str, record_id: Option<&RecordId>) -> bool {
        self.compliance.can_modify_field(field, record_id)
    }

    /// Like [`can_modify_field`](Self::can_modify_field) but with a reason
    /// on denial, and the `require_reason` check applied.
    pub fn evaluate_modification(
        &self,
        field: &str,
        record_id: Option<&RecordId>,
        reason: Option<&str>,
    ) -> Verdict {
        self.compliance.evaluate_modification(field, record_id, reason)
    }

    // -- redaction ---------------------------------------------------------

    /// A copy of `data` with every field the current user may not view
    /// masked. The input is never modified.
    pub fn redact_sensitive_data(&self, data: &Value) -> Value {
        self.compliance.redact(data)
    }

    pub fn mask_field(&self, field: &str, value: &Value) -> Value {
        self.compliance.mask_field(field, value)
    }

    /// Replace the whole redaction config. Fields absent from `config` are
    /// dropped; use [`update_redaction_config`](Self::update_redaction_config)
    /// to change part of the current one.
    pub fn set_redaction_config(&mut self, config: RedactionConfig) {
        debug!(enabled = config.enabled, "redaction config replaced");
        self.compliance.redaction = config;
    }

    pub fn update_redaction_config(&mut self, f: impl FnOnce(&mut RedactionConfig)) {
        f(&mut self.compliance.redaction);
        debug!(enabled = self.compliance.redaction.enabled, "redaction config updated");
    }

    // -- immutability ------------------------------------------------------

    /// Replace the whole immutability config, including its locked records.
    /// Use [`update_immutability_config`](Self::update_immutability_config)
    /// to change part of the current one.
    pub fn set_immutability_config(&mut self, config: ImmutabilityConfig) {
        debug!(enabled = config.enabled, "immutability config replaced");
        self.compliance.immutability = config;
    }

    pub fn update_immutability_config(&mut self, f: impl FnOnce(&mut ImmutabilityConfig)) {
        f(&mut self.compliance.immutability);
        debug!(enabled = self.compliance.immutability.enabled, "immutability config updated");
    }

    /// Lock a record against all modification.
    ///
    /// Appends a `lock_record` entry when the record was not already locked.
    /// Returns whether the lock set changed.
    pub fn lock_record(&mut self, record_id: impl Into<RecordId>) -> bool {
        let record_id = record_id.into();
        let changed = self.compliance.immutability.lock(record_id.clone());
        if changed {
            self.compliance.add_audit_log(
                NewAuditEntry::new(AuditAction::custom("lock_record"), RECORD_ENTITY_TYPE)
                    .entity(record_id.as_str()),
            );
        }
        changed
    }

    /// Unlock a record. Appends an `unlock_record` entry if it was locked.
    pub fn unlock_record(&mut self, record_id: &str) -> bool {
        let changed = self.compliance.immutability.unlock(record_id);
        if changed {
            self.compliance.add_audit_log(
                NewAuditEntry::new(AuditAction::custom("unlock_record"), RECORD_ENTITY_TYPE)
                    .entity(record_id),
            );
        }
        changed
    }

    pub fn is_record_locked(&self, record_id: &str) -> bool {
        self.compliance.immutability.is_locked(record_id)
    }

    // -- audit -------------------------------------------------------------

    /// Append an entry attributed to the current user.
    pub fn add_audit_log(&mut self, draft: NewAuditEntry) -> AuditEntry {
        self.compliance.add_audit_log(draft)
    }

    pub fn audit_log(&self) -> &AuditLog {
        self.compliance.audit_log()
    }

    /// Retained entries for `entity_id`, or all of them, oldest first.
    pub fn audit_entries(&self, entity_id: Option<&str>) -> Vec<AuditEntry> {
        self.compliance.audit_log.query(entity_id)
    }

    // -- subscriptions -----------------------------------------------------

    /// Call `listener` with the new state after every write.
    pub fn subscribe(&mut self, listener: impl Fn(&S) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }
}

impl<S: Serialize + DeserializeOwned> ComplianceStore<S> {
    /// Mutate the state in place.
    pub fn set(&mut self, f: impl FnOnce(&mut S)) {
        f(&mut self.state);
        self.record_write(false);
        self.after_write();
    }

    /// Swap in a whole new state, returning the previous one.
    pub fn replace(&mut self, state: S) -> S {
        let old = std::mem::replace(&mut self.state, state);
        self.record_write(true);
        self.after_write();
        old
    }

    /// Mutate the state and record a domain entry describing the change.
    ///
    /// The implicit state-write entry (if enabled) comes first, then
    /// `draft`. Subscribers see the state once both are in the log.
    pub fn set_audited(&mut self, draft: NewAuditEntry, f: impl FnOnce(&mut S)) -> AuditEntry {
        f(&mut self.state);
        self.record_write(false);
        let entry = self.compliance.add_audit_log(draft);
        self.after_write();
        entry
    }

    fn record_write(&mut self, replace: bool) {
        if self.compliance.log_state_writes {
            self.compliance.add_audit_log(
                NewAuditEntry::new(AuditAction::Update, STATE_ENTITY_TYPE)
                    .metadata(json!({ "replace": replace })),
            );
        }
    }

    fn after_write(&mut self) {
        self.notify();
        if self.persistence.is_some() && !self.persist_keys.is_empty() {
            if let Err(e) = self.persist() {
                warn!(error = %e, "failed to persist state");
            }
        }
    }

    /// The whole state, serialized and redacted for the current user.
    pub fn redacted_state(&self) -> Result<Value, CustodiaError> {
        let value = serialize_state(&self.state)?;
        Ok(self.compliance.redact(&value))
    }

    /// The allow-listed subset of the serialized state.
    pub fn persisted_snapshot(&self) -> Result<Map<String, Value>, CustodiaError> {
        let value = serialize_state(&self.state)?;
        Ok(select_persisted(&value, &self.persist_keys))
    }

    /// Save the allow-listed keys. A no-op without an adapter.
    pub fn persist(&mut self) -> Result<(), CustodiaError> {
        if self.persistence.is_none() {
            return Ok(());
        }
        let snapshot = self.persisted_snapshot()?;
        if let Some(adapter) = self.persistence.as_mut() {
            adapter.save(&snapshot)?;
        }
        Ok(())
    }

    /// Load saved keys from the adapter and merge them into the state.
    ///
    /// Only keys in the allow-list are applied. Returns `Ok(false)` when
    /// there is no adapter or nothing was saved. If the merged value does
    /// not deserialize, the state is left untouched and an error returned.
    pub fn hydrate(&mut self) -> Result<bool, CustodiaError> {
        let loaded = match self.persistence.as_mut() {
            Some(adapter) => adapter.load()?,
            None => return Ok(false),
        };
        let Some(loaded) = loaded else {
            return Ok(false);
        };

        let mut current = serialize_state(&self.state)?;
        let Value::Object(obj) = &mut current else {
            return Err(CustodiaError::SerializationError(
                "state does not serialize to an object".into(),
            ));
        };

        let mut applied = 0;
        for (key, value) in loaded {
            if key != COMPLIANCE_STATE_KEY && self.persist_keys.contains(&key) {
                obj.insert(key, value);
                applied += 1;
            }
        }

        let state: S = serde_json::from_value(current)
            .map_err(|e| CustodiaError::SerializationError(format!("hydrated state: {e}")))?;
        self.state = state;
        debug!(keys = applied, "state hydrated");
        self.notify();
        Ok(true)
    }
}

fn serialize_state<S: Serialize>(state: &S) -> Result<Value, CustodiaError> {
    serde_json::to_value(state).map_err(|e| CustodiaError::SerializationError(e.to_string()))
}

impl<S: fmt::Debug> fmt::Debug for ComplianceStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceStore")
            .field("state", &self.state)
            .field("compliance", &self.compliance)
            .field("persist_keys", &self.persist_keys)
            .field("persistence", &self.persistence.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Builder for stores that need persistence, audit middleware or a custom
/// audit window.
#[derive(Default)]
pub struct ComplianceStoreBuilder {
    config: ComplianceConfig,
    persistence: Option<Box<dyn PersistenceAdapter>>,
    middleware: Vec<Arc<dyn AuditMiddleware>>,
    audit_capacity: Option<usize>,
}

impl ComplianceStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ComplianceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn persistence(mut self, adapter: impl PersistenceAdapter + 'static) -> Self {
        self.persistence = Some(Box::new(adapter));
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn AuditMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Audit window size. Defaults to [`custodia_ledger::MAX_AUDIT_ENTRIES`].
    pub fn audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = Some(capacity);
        self
    }

    /// Validate the config, build the store and hydrate it from the
    /// adapter. Hydration failures are logged; the store keeps `state`.
    pub fn build<S: Serialize + DeserializeOwned>(
        self,
        state: S,
    ) -> Result<ComplianceStore<S>, CustodiaError> {
        self.config.validate()?;

        let mut compliance = ComplianceState::from_config(&self.config);
        if let Some(capacity) = self.audit_capacity {
            compliance.audit_log = AuditLog::with_capacity(capacity);
        }
        for m in self.middleware {
            compliance.audit_log.add_middleware(m);
        }

        let mut store =
            ComplianceStore::assemble(state, compliance, self.config.persist_keys, self.persistence);
        if let Err(e) = store.hydrate() {
            warn!(error = %e, "state hydration failed, keeping initial state");
        }
        Ok(store)
    }
}

impl fmt::Debug for ComplianceStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceStoreBuilder")
            .field("config", &self.config)
            .field("persistence", &self.persistence.is_some())
            .field("middleware", &self.middleware.len())
            .field("audit_capacity", &self.audit_capacity)
            .finish()
    }
}

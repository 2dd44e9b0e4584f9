//! The private compliance sub-state every store owns.

use serde_json::Value;
use tracing::info;

use custodia_ledger::{AuditEntry, AuditLog, NewAuditEntry};
use custodia_mask::mask_value;
use custodia_policy::AccessPolicy;
use custodia_types::{
    ComplianceConfig, ImmutabilityConfig, RecordId, RedactionConfig, UserContext, Verdict,
    DEFAULT_MASK_CHAR,
};

use crate::redact;

/// Redaction and immutability configs, the acting user, and the audit log
/// of one store. Never shared between stores.
#[derive(Debug)]
pub struct ComplianceState {
    pub(crate) redaction: RedactionConfig,
    pub(crate) immutability: ImmutabilityConfig,
    pub(crate) user_context: Option<UserContext>,
    pub(crate) audit_log: AuditLog,
    pub(crate) mask_char: char,
    pub(crate) log_state_writes: bool,
}

impl ComplianceState {
    /// Redaction disabled, default immutable fields, no user.
    pub fn new() -> Self {
        Self {
            redaction: RedactionConfig::default(),
            immutability: ImmutabilityConfig::default(),
            user_context: None,
            audit_log: AuditLog::new(),
            mask_char: DEFAULT_MASK_CHAR,
            log_state_writes: true,
        }
    }

    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self {
            redaction: config.redaction_config(),
            immutability: config.immutability_config(),
            user_context: None,
            audit_log: AuditLog::new(),
            mask_char: config.mask_char,
            log_state_writes: config.log_state_writes,
        }
    }

    pub fn redaction(&self) -> &RedactionConfig {
        &self.redaction
    }

    pub fn immutability(&self) -> &ImmutabilityConfig {
        &self.immutability
    }

    pub fn user_context(&self) -> Option<&UserContext> {
        self.user_context.as_ref()
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn mask_char(&self) -> char {
        self.mask_char
    }

    pub(crate) fn set_user_context(&mut self, context: Option<UserContext>) {
        match &context {
            Some(ctx) => info!(user_id = %ctx.user_id, roles = ctx.roles.len(), "user context set"),
            None => info!("user context cleared"),
        }
        self.user_context = context;
    }

    /// Append to the audit log, attributed to the current user.
    pub(crate) fn add_audit_log(&mut self, draft: NewAuditEntry) -> AuditEntry {
        let user_id = self.user_context.as_ref().map(|c| c.user_id.as_str());
        self.audit_log.append(draft, user_id)
    }

    pub fn can_view_field(&self, field: &str) -> bool {
        AccessPolicy::can_view(field, &self.redaction, self.user_context.as_ref())
    }

    pub fn can_modify_field(&self, field: &str, record_id: Option<&RecordId>) -> bool {
        AccessPolicy::can_modify(field, &self.immutability, record_id)
    }

    pub fn evaluate_modification(
        &self,
        field: &str,
        record_id: Option<&RecordId>,
        reason: Option<&str>,
    ) -> Verdict {
        AccessPolicy::evaluate_modification(field, &self.immutability, record_id, reason)
    }

    /// Mask `value` with the pattern configured for `field`.
    pub fn mask_field(&self, field: &str, value: &Value) -> Value {
        let pattern = AccessPolicy::mask_pattern_for(field, &self.redaction);
        mask_value(value, pattern, self.mask_char)
    }

    /// Mask every field the current user may not view. See [`redact::redact_value`].
    pub fn redact(&self, data: &Value) -> Value {
        redact::redact_value(self, data)
    }
}

impl Default for ComplianceState {
    fn default() -> Self {
        Self::new()
    }
}

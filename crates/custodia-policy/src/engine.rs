//! View and modify decisions over a store's redaction and immutability configs.
//!
//! Viewability is permission-driven and can differ per user. Modifiability
//! is structural: an immutable field stays immutable for every user,
//! admins included.

use custodia_types::{
    ImmutabilityConfig, MaskPattern, RecordId, RedactionConfig, SensitivityLevel, UserContext,
    Verdict,
};

use crate::builtin::{VIEW_PHI, VIEW_PII};

/// Stateless evaluator for field access.
///
/// All inputs are passed explicitly so the same evaluator serves every
/// store; the store owns the configs and the current user context.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Whether `user` may see the raw value of `field`.
    ///
    /// An explicit visibility rule takes precedence over the field's
    /// sensitivity level. Without a user, any rule or non-public level denies.
    pub fn can_view(field: &str, config: &RedactionConfig, user: Option<&UserContext>) -> bool {
        if !config.enabled {
            return true;
        }

        if let Some(rule) = config.rule(field) {
            let Some(user) = user else {
                return false;
            };
            let role_ok = rule.required_roles.is_empty() || user.has_any_role(&rule.required_roles);
            let perms_ok = rule.required_permissions.is_empty()
                || user.has_all_permissions(&rule.required_permissions);
            return role_ok && perms_ok;
        }

        match config.sensitivity(field) {
            SensitivityLevel::Public => true,
            level => match user {
                None => false,
                Some(user) => match level {
                    SensitivityLevel::Phi => user.has_permission(VIEW_PHI),
                    SensitivityLevel::Pii => user.has_permission(VIEW_PII),
                    // Internal and confidential only require a signed-in user.
                    _ => true,
                },
            },
        }
    }

    /// Whether `field` (optionally on `record_id`) may be written.
    pub fn can_modify(
        field: &str,
        config: &ImmutabilityConfig,
        record_id: Option<&RecordId>,
    ) -> bool {
        if !config.enabled {
            return true;
        }
        if config.is_immutable(field) {
            return false;
        }
        if let Some(id) = record_id {
            if config.is_locked(id.as_str()) {
                return false;
            }
        }
        true
    }

    /// Like [`can_modify`](Self::can_modify), but explains a denial and
    /// enforces `require_reason` on the change.
    pub fn evaluate_modification(
        field: &str,
        config: &ImmutabilityConfig,
        record_id: Option<&RecordId>,
        reason: Option<&str>,
    ) -> Verdict {
        let record = record_id.cloned();
        if !config.enabled {
            return Verdict::allow(field, record);
        }

        let verdict = if config.is_immutable(field) {
            Verdict::deny(field, record, format!("field '{field}' is immutable"))
        } else if let Some(id) = record_id.filter(|id| config.is_locked(id.as_str())) {
            Verdict::deny(field, record, format!("record '{id}' is locked"))
        } else if config.require_reason && reason.map_or(true, |r| r.trim().is_empty()) {
            Verdict::deny(field, record, "a reason is required for this change")
        } else {
            Verdict::allow(field, record)
        };

        if !verdict.is_allowed() {
            tracing::debug!(field = %field, reason = %verdict.reason, "modification denied");
        }
        verdict
    }

    /// The pattern used to mask `field`: the rule's, then the configured
    /// per-field pattern, then [`MaskPattern::Full`].
    pub fn mask_pattern_for(field: &str, config: &RedactionConfig) -> MaskPattern {
        config
            .rule(field)
            .map(|r| r.mask_pattern)
            .or_else(|| config.field_mask_patterns.get(field).copied())
            .unwrap_or_default()
    }

    /// Whether `field` carries any restriction (a rule or a non-public level).
    pub fn is_restricted(field: &str, config: &RedactionConfig) -> bool {
        config.rule(field).is_some() || config.sensitivity(field) != SensitivityLevel::Public
    }
}

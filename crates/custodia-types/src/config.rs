//! Configuration types for Custodia stores.
//!
//! [`ComplianceConfig`] is the closed record supplied once when a store is
//! created. It is split into the two runtime configs the access policy
//! works on: [`RedactionConfig`] (who may see what) and
//! [`ImmutabilityConfig`] (what may never change).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::RecordId;
use crate::sensitivity::{MaskPattern, SensitivityLevel};
use crate::CustodiaError;

/// Fields that are immutable unless a config says otherwise.
pub const DEFAULT_IMMUTABLE_FIELDS: [&str; 3] = ["id", "created_at", "created_by"];

/// Character used by the masking engine unless configured otherwise.
pub const DEFAULT_MASK_CHAR: char = '•';

/// Reserved state key for compliance internals. Never persisted.
pub const COMPLIANCE_STATE_KEY: &str = "_compliance";

/// An explicit visibility rule for one field.
///
/// Access requires at least one of `required_roles` (if any are listed) and
/// every one of `required_permissions` (if any are listed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldVisibilityRule {
    pub field: String,
    #[serde(default)]
    pub required_roles: BTreeSet<String>,
    #[serde(default)]
    pub required_permissions: BTreeSet<String>,
    #[serde(default)]
    pub mask_pattern: MaskPattern,
}

impl FieldVisibilityRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn require_role(mut self, role: impl Into<String>) -> Self {
        self.required_roles.insert(role.into());
        self
    }

    pub fn require_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.insert(permission.into());
        self
    }

    pub fn mask_with(mut self, pattern: MaskPattern) -> Self {
        self.mask_pattern = pattern;
        self
    }
}

/// Runtime redaction settings of a store.
///
/// Defaults to disabled and empty: nothing is restricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub sensitive_fields: BTreeMap<String, SensitivityLevel>,
    pub field_mask_patterns: BTreeMap<String, MaskPattern>,
    /// At most one rule per field, keyed by field name.
    pub visibility_rules: BTreeMap<String, FieldVisibilityRule>,
}

impl RedactionConfig {
    /// An enabled, empty redaction config.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_sensitive(mut self, field: impl Into<String>, level: SensitivityLevel) -> Self {
        self.sensitive_fields.insert(field.into(), level);
        self
    }

    pub fn with_mask(mut self, field: impl Into<String>, pattern: MaskPattern) -> Self {
        self.field_mask_patterns.insert(field.into(), pattern);
        self
    }

    /// Add a rule, replacing any existing rule for the same field.
    pub fn with_rule(mut self, rule: FieldVisibilityRule) -> Self {
        self.visibility_rules.insert(rule.field.clone(), rule);
        self
    }

    /// Declared sensitivity of `field`; undeclared fields are public.
    pub fn sensitivity(&self, field: &str) -> SensitivityLevel {
        self.sensitive_fields
            .get(field)
            .copied()
            .unwrap_or_default()
    }

    pub fn rule(&self, field: &str) -> Option<&FieldVisibilityRule> {
        self.visibility_rules.get(field)
    }
}

/// Runtime immutability settings of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutabilityConfig {
    pub enabled: bool,
    pub immutable_fields: BTreeSet<String>,
    pub locked_records: BTreeSet<RecordId>,
    /// Whether a change must carry a non-empty reason to be accepted.
    pub require_reason: bool,
}

impl Default for ImmutabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            immutable_fields: DEFAULT_IMMUTABLE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            locked_records: BTreeSet::new(),
            require_reason: false,
        }
    }
}

impl ImmutabilityConfig {
    pub fn is_immutable(&self, field: &str) -> bool {
        self.immutable_fields.contains(field)
    }

    pub fn is_locked(&self, record_id: &str) -> bool {
        self.locked_records.contains(record_id)
    }

    /// Lock a record. Returns false if it was already locked.
    pub fn lock(&mut self, record_id: RecordId) -> bool {
        self.locked_records.insert(record_id)
    }

    /// Unlock a record. Returns false if it was not locked.
    pub fn unlock(&mut self, record_id: &str) -> bool {
        self.locked_records.remove(record_id)
    }
}

/// Top-level configuration supplied when a store is created.
///
/// Unknown keys are rejected when parsing, so a misspelled option fails
/// loudly instead of silently leaving a field unprotected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplianceConfig {
    pub sensitive_fields: BTreeMap<String, SensitivityLevel>,
    pub field_mask_patterns: BTreeMap<String, MaskPattern>,
    pub visibility_rules: Vec<FieldVisibilityRule>,
    pub immutable_fields: Vec<String>,
    pub locked_records: Vec<RecordId>,
    pub require_reason: bool,
    pub redaction_enabled: bool,
    pub immutability_enabled: bool,
    /// State keys handed to the persistence adapter. Empty means nothing is persisted.
    pub persist_keys: Vec<String>,
    pub mask_char: char,
    /// Append an implicit `update` entry for every state write.
    pub log_state_writes: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: BTreeMap::new(),
            field_mask_patterns: BTreeMap::new(),
            visibility_rules: Vec::new(),
            immutable_fields: DEFAULT_IMMUTABLE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            locked_records: Vec::new(),
            require_reason: false,
            redaction_enabled: true,
            immutability_enabled: true,
            persist_keys: Vec::new(),
            mask_char: DEFAULT_MASK_CHAR,
            log_state_writes: true,
        }
    }
}

impl ComplianceConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CustodiaError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CustodiaError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, CustodiaError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| CustodiaError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, CustodiaError> {
        toml::to_string_pretty(self).map_err(|e| CustodiaError::ConfigError(e.to_string()))
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), CustodiaError> {
        let mut rule_fields = BTreeSet::new();
        for rule in &self.visibility_rules {
            if rule.field.is_empty() {
                return Err(CustodiaError::ConfigError(
                    "visibility rule with empty field name".into(),
                ));
            }
            if !rule_fields.insert(rule.field.as_str()) {
                return Err(CustodiaError::ConfigError(format!(
                    "duplicate visibility rule for field '{}'",
                    rule.field
                )));
            }
        }

        let named = self
            .sensitive_fields
            .keys()
            .chain(self.field_mask_patterns.keys())
            .chain(self.immutable_fields.iter());
        for field in named {
            if field.is_empty() {
                return Err(CustodiaError::ConfigError("empty field name".into()));
            }
        }

        let mut keys = BTreeSet::new();
        for key in &self.persist_keys {
            if key == COMPLIANCE_STATE_KEY {
                return Err(CustodiaError::ConfigError(format!(
                    "'{COMPLIANCE_STATE_KEY}' is reserved and cannot be persisted"
                )));
            }
            if !keys.insert(key.as_str()) {
                return Err(CustodiaError::ConfigError(format!(
                    "duplicate persist key '{key}'"
                )));
            }
            let classified = self
                .sensitive_fields
                .get(key)
                .is_some_and(|level| *level != SensitivityLevel::Public);
            if classified || rule_fields.contains(key.as_str()) {
                return Err(CustodiaError::ConfigError(format!(
                    "persist key '{key}' names a sensitive field"
                )));
            }
        }

        Ok(())
    }

    /// The redaction half of this config.
    pub fn redaction_config(&self) -> RedactionConfig {
        RedactionConfig {
            enabled: self.redaction_enabled,
            sensitive_fields: self.sensitive_fields.clone(),
            field_mask_patterns: self.field_mask_patterns.clone(),
            visibility_rules: self
                .visibility_rules
                .iter()
                .map(|r| (r.field.clone(), r.clone()))
                .collect(),
        }
    }

    /// The immutability half of this config.
    pub fn immutability_config(&self) -> ImmutabilityConfig {
        ImmutabilityConfig {
            enabled: self.immutability_enabled,
            immutable_fields: self.immutable_fields.iter().cloned().collect(),
            locked_records: self.locked_records.iter().cloned().collect(),
            require_reason: self.require_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_protect_audit_fields() {
        let config = ComplianceConfig::default();
        assert_eq!(config.immutable_fields, vec!["id", "created_at", "created_by"]);
        assert_eq!(config.mask_char, '•');
        assert!(config.persist_keys.is_empty());

        let immut = config.immutability_config();
        assert!(immut.enabled);
        assert!(immut.is_immutable("created_by"));
        assert!(!immut.is_immutable("name"));
    }

    #[test]
    fn parses_toml() {
        let config = ComplianceConfig::from_toml(
            r#"
            persist_keys = ["selectedFramework"]
            mask_char = "*"
            immutable_fields = ["id", "code", "framework_id"]

            [sensitive_fields]
            ssn = "pii"
            diagnosis = "phi"

            [field_mask_patterns]
            ssn = "ssn"

            [[visibility_rules]]
            field = "salary"
            required_roles = ["hr"]
            mask_pattern = "hash"
            "#,
        )
        .unwrap();

        assert_eq!(config.mask_char, '*');
        assert_eq!(config.persist_keys, vec!["selectedFramework"]);

        let redaction = config.redaction_config();
        assert!(redaction.enabled);
        assert_eq!(redaction.sensitivity("ssn"), SensitivityLevel::Pii);
        assert_eq!(redaction.sensitivity("name"), SensitivityLevel::Public);
        assert_eq!(redaction.field_mask_patterns["ssn"], MaskPattern::Ssn);
        let rule = redaction.rule("salary").unwrap();
        assert!(rule.required_roles.contains("hr"));
        assert_eq!(rule.mask_pattern, MaskPattern::Hash);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ComplianceConfig::from_toml("sensitve_fields = {}").unwrap_err();
        assert!(matches!(err, CustodiaError::ConfigError(_)));

        let err = ComplianceConfig::from_json(r#"{"maskChar": "*"}"#).unwrap_err();
        assert!(matches!(err, CustodiaError::ConfigError(_)));
    }

    #[test]
    fn unknown_mask_pattern_in_config_is_full() {
        let config =
            ComplianceConfig::from_json(r#"{"field_mask_patterns": {"ssn": "sha512"}}"#).unwrap();
        assert_eq!(config.field_mask_patterns["ssn"], MaskPattern::Full);
    }

    #[test]
    fn rejects_reserved_persist_key() {
        let config = ComplianceConfig {
            persist_keys: vec!["token".into(), COMPLIANCE_STATE_KEY.into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_rules_and_keys() {
        let config = ComplianceConfig {
            visibility_rules: vec![
                FieldVisibilityRule::new("ssn"),
                FieldVisibilityRule::new("ssn").require_role("admin"),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ComplianceConfig {
            persist_keys: vec!["a".into(), "a".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_persisting_sensitive_fields() {
        let config = ComplianceConfig {
            sensitive_fields: [
                ("ssn".to_string(), SensitivityLevel::Pii),
                ("nickname".to_string(), SensitivityLevel::Public),
            ]
            .into(),
            persist_keys: vec!["ssn".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ssn"));

        let config = ComplianceConfig {
            visibility_rules: vec![FieldVisibilityRule::new("salary").require_role("hr")],
            persist_keys: vec!["salary".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CustodiaError::ConfigError(_))));

        let config = ComplianceConfig {
            sensitive_fields: [("nickname".to_string(), SensitivityLevel::Public)].into(),
            persist_keys: vec!["nickname".into(), "theme".into()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_roundtrip() {
        let config = ComplianceConfig {
            visibility_rules: vec![FieldVisibilityRule::new("notes")
                .require_permission("view_notes")
                .mask_with(MaskPattern::Partial)],
            locked_records: vec![RecordId::from("org-1")],
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        let back = ComplianceConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn lock_and_unlock_records() {
        let mut immut = ImmutabilityConfig::default();
        assert!(immut.lock(RecordId::from("r-1")));
        assert!(!immut.lock(RecordId::from("r-1")));
        assert!(immut.is_locked("r-1"));
        assert!(immut.unlock("r-1"));
        assert!(!immut.is_locked("r-1"));
    }
}

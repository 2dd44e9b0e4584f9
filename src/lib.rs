//! Custodia: compliance controls for application state.
//!
//! A [`ComplianceStore`] wraps a domain state value and adds:
//!
//! - field-level redaction driven by sensitivity levels and explicit
//!   visibility rules, with deterministic masking ([`mask`]);
//! - immutability checks for audit fields and locked records ([`policy`]);
//! - a bounded, hash-chained audit log ([`ledger`]);
//! - persistence of an allow-listed subset of state ([`store::persist`]).
//!
//! ```no_run
//! use custodia::{ComplianceConfig, ComplianceStore, UserContext};
//! use serde_json::json;
//!
//! let config = ComplianceConfig::from_toml(r#"
//!     [sensitive_fields]
//!     ssn = "pii"
//!     [field_mask_patterns]
//!     ssn = "ssn"
//! "#)?;
//! let mut store = ComplianceStore::with_config(json!({}), config)?;
//! store.set_user_context(Some(UserContext::new("clerk-7")));
//!
//! let view = store.redact_sensitive_data(&json!({"ssn": "123-45-6789"}));
//! assert_eq!(view["ssn"], "•••-••-6789");
//! # Ok::<(), custodia::CustodiaError>(())
//! ```

pub use custodia_ledger as ledger;
pub use custodia_mask as mask;
pub use custodia_policy as policy;
pub use custodia_store as store;
pub use custodia_types as types;

pub use custodia_ledger::{
    AuditAction, AuditEntry, AuditFilter, AuditLog, AuditMiddleware, ExportMode, FieldChange,
    IntegrityReport, NdjsonSink, NewAuditEntry, MAX_AUDIT_ENTRIES,
};
pub use custodia_mask::{mask_str, mask_value};
pub use custodia_policy::AccessPolicy;
pub use custodia_store::{
    ComplianceStore, ComplianceStoreBuilder, JsonFileAdapter, MemoryAdapter, PersistenceAdapter,
    SharedComplianceStore, SqliteAdapter, SubscriptionId, MAX_REDACTION_DEPTH,
};
pub use custodia_types::{
    ComplianceConfig, CustodiaError, Decision, FieldVisibilityRule, ImmutabilityConfig,
    MaskPattern, RecordId, RedactionConfig, SensitivityLevel, UserContext, Verdict,
};

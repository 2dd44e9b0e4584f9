//! Core types shared across all Custodia crates.
//!
//! Defines sensitivity levels, mask patterns, user contexts, the runtime
//! redaction/immutability configs, verdicts, and the error type used by the
//! masking engine, access policy, audit ledger, and state container.

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod sensitivity;
pub mod verdict;

pub use config::{
    ComplianceConfig, FieldVisibilityRule, ImmutabilityConfig, RedactionConfig,
    COMPLIANCE_STATE_KEY, DEFAULT_IMMUTABLE_FIELDS, DEFAULT_MASK_CHAR,
};
pub use context::UserContext;
pub use error::CustodiaError;
pub use ids::RecordId;
pub use sensitivity::{MaskPattern, SensitivityLevel};
pub use verdict::{Decision, Verdict};

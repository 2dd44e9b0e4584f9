//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::{NamedTempFile, TempDir};

use custodia::{
    ComplianceConfig, FieldVisibilityRule, MaskPattern, SensitivityLevel, UserContext,
};

/// Domain state shaped like a compliance-framework selection screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkState {
    pub selected_framework: Option<String>,
    pub frameworks: Vec<String>,
    pub search_query: String,
}

/// Domain state holding patient records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientState {
    pub patients: Vec<Value>,
}

/// Create a temporary directory for file-backed adapters.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("should create temp dir")
}

/// Create a temporary file for use as a test database.
pub fn temp_db() -> NamedTempFile {
    NamedTempFile::new().expect("should create temp file for state database")
}

/// `{ssn: pii}` with the ssn mask pattern.
pub fn ssn_config() -> ComplianceConfig {
    ComplianceConfig {
        sensitive_fields: [("ssn".to_string(), SensitivityLevel::Pii)].into(),
        field_mask_patterns: [("ssn".to_string(), MaskPattern::Ssn)].into(),
        ..Default::default()
    }
}

/// A healthcare-flavoured config covering every sensitivity level.
pub fn clinic_config() -> ComplianceConfig {
    ComplianceConfig {
        sensitive_fields: [
            ("ssn".to_string(), SensitivityLevel::Pii),
            ("phone".to_string(), SensitivityLevel::Pii),
            ("diagnosis".to_string(), SensitivityLevel::Phi),
            ("notes".to_string(), SensitivityLevel::Confidential),
            ("department".to_string(), SensitivityLevel::Internal),
        ]
        .into(),
        field_mask_patterns: [
            ("ssn".to_string(), MaskPattern::Ssn),
            ("phone".to_string(), MaskPattern::Phone),
            ("diagnosis".to_string(), MaskPattern::Hash),
        ]
        .into(),
        visibility_rules: vec![FieldVisibilityRule::new("email")
            .require_role("admin")
            .mask_with(MaskPattern::Email)],
        ..Default::default()
    }
}

pub fn clerk() -> UserContext {
    UserContext::new("clerk-7").with_role("staff")
}

pub fn clinician() -> UserContext {
    UserContext::new("dr-grey")
        .with_role("clinician")
        .with_permission("view_phi")
        .with_permission("view_pii")
}

pub fn admin() -> UserContext {
    UserContext::new("root")
        .with_role("admin")
        .with_permission("view_phi")
        .with_permission("view_pii")
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

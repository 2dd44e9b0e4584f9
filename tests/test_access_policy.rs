//! Integration tests for view and modify decisions made through a store.

mod common;

use serde_json::json;

use custodia::{
    ComplianceConfig, ComplianceStore, Decision, RecordId, SensitivityLevel, UserContext,
};

use common::{admin, clerk, clinic_config, clinician, PatientState};

fn clinic_store() -> ComplianceStore<PatientState> {
    ComplianceStore::with_config(PatientState::default(), clinic_config())
        .expect("clinic config should be valid")
}

#[test]
fn test_phi_visible_only_with_view_phi() {
    let mut store = clinic_store();
    assert!(!store.can_view_field("diagnosis"), "no user must not see PHI");

    store.set_user_context(Some(clerk()));
    assert!(!store.can_view_field("diagnosis"), "user without view_phi");

    store.set_user_context(Some(UserContext::new("nurse").with_permission("view_phi")));
    assert!(store.can_view_field("diagnosis"));
    assert!(!store.can_view_field("ssn"), "view_phi does not grant PII");
}

#[test]
fn test_internal_and_confidential_need_any_user() {
    let mut store = clinic_store();
    assert!(!store.can_view_field("department"));
    assert!(!store.can_view_field("notes"));
    assert!(store.can_view_field("name"));

    store.set_user_context(Some(clerk()));
    assert!(store.can_view_field("department"));
    assert!(store.can_view_field("notes"));
}

#[test]
fn test_explicit_rule_overrides_level() {
    let mut config = clinic_config();
    config
        .sensitive_fields
        .insert("email".to_string(), SensitivityLevel::Public);
    let mut store = ComplianceStore::with_config(PatientState::default(), config).unwrap();

    // The rule wins over the public level.
    store.set_user_context(Some(clinician()));
    assert!(!store.can_view_field("email"));
    store.set_user_context(Some(admin()));
    assert!(store.can_view_field("email"));
}

#[test]
fn test_id_is_immutable_even_for_admin() {
    let mut store = clinic_store();
    for user in [None, Some(clerk()), Some(admin())] {
        store.set_user_context(user);
        assert!(!store.can_modify_field("id", None));
        assert!(!store.can_modify_field("id", Some(&RecordId::from("p-1"))));
        assert!(!store.can_modify_field("created_at", None));
        assert!(!store.can_modify_field("created_by", None));
    }
}

#[test]
fn test_locked_record_blocks_every_field() {
    let mut store = clinic_store();
    store.set_user_context(Some(admin()));
    let record = RecordId::from("p-42");
    let other = RecordId::from("p-43");

    assert!(store.can_modify_field("notes", Some(&record)));
    store.lock_record(record.clone());

    for field in ["notes", "name", "diagnosis", "anything"] {
        assert!(!store.can_modify_field(field, Some(&record)), "{field}");
        assert!(store.can_modify_field(field, Some(&other)), "{field}");
    }

    let verdict = store.evaluate_modification("notes", Some(&record), Some("typo"));
    assert_eq!(verdict.decision, Decision::Deny);
    assert_eq!(verdict.reason, "record 'p-42' is locked");
}

#[test]
fn test_locked_records_from_config() {
    let config = ComplianceConfig::from_json(r#"{"locked_records": ["org-9"]}"#).unwrap();
    let store = ComplianceStore::with_config(json!({}), config).unwrap();
    assert!(store.is_record_locked("org-9"));
    assert!(!store.can_modify_field("name", Some(&RecordId::from("org-9"))));
}

#[test]
fn test_require_reason() {
    let config = ComplianceConfig {
        require_reason: true,
        ..Default::default()
    };
    let store = ComplianceStore::with_config(json!({}), config).unwrap();

    assert!(!store.evaluate_modification("name", None, None).is_allowed());
    assert!(!store.evaluate_modification("name", None, Some("  ")).is_allowed());
    assert!(store
        .evaluate_modification("name", None, Some("ticket #12"))
        .is_allowed());
    // Immutability is checked before the reason.
    let verdict = store.evaluate_modification("id", None, Some("ticket #12"));
    assert_eq!(verdict.reason, "field 'id' is immutable");
}

#[test]
fn test_custom_immutable_fields_replace_defaults() {
    let config = ComplianceConfig {
        immutable_fields: vec!["code".into(), "framework_id".into()],
        ..Default::default()
    };
    let store = ComplianceStore::with_config(json!({}), config).unwrap();
    assert!(!store.can_modify_field("code", None));
    assert!(!store.can_modify_field("framework_id", None));
    assert!(store.can_modify_field("id", None));
}

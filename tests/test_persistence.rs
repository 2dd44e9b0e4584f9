//! Integration tests for allow-listed persistence through the JSON file and
//! SQLite adapters.

mod common;

use serde_json::{json, Value};

use custodia::store::select_persisted;
use custodia::{
    ComplianceConfig, ComplianceStore, ComplianceStoreBuilder, JsonFileAdapter, MemoryAdapter,
    PersistenceAdapter, SqliteAdapter,
};

use common::{clinic_config, object, temp_db, temp_dir, FrameworkState, PatientState};

fn framework_config() -> ComplianceConfig {
    ComplianceConfig {
        persist_keys: vec!["selectedFramework".into()],
        ..Default::default()
    }
}

fn selected(name: &str) -> FrameworkState {
    FrameworkState {
        selected_framework: Some(name.into()),
        frameworks: vec!["hipaa".into(), "soc2".into()],
        search_query: "typed but not saved".into(),
    }
}

#[test]
fn test_snapshot_contains_only_allow_listed_keys() {
    let store = ComplianceStore::with_config(selected("hipaa"), framework_config()).unwrap();
    let snapshot = store.persisted_snapshot().unwrap();
    assert_eq!(Value::Object(snapshot), json!({"selectedFramework": "hipaa"}));
}

#[test]
fn test_compliance_key_never_selected() {
    let state = json!({"_compliance": {"auditLogs": []}, "theme": "dark"});
    let keys = vec!["_compliance".to_string(), "theme".to_string()];
    assert_eq!(
        Value::Object(select_persisted(&state, &keys)),
        json!({"theme": "dark"})
    );
}

#[test]
fn test_no_persist_keys_means_nothing_saved() {
    let adapter = MemoryAdapter::new();
    let mut store = ComplianceStoreBuilder::new()
        .persistence(adapter.clone())
        .build(FrameworkState::default())
        .unwrap();
    store.set(|s| s.selected_framework = Some("hipaa".into()));
    assert_eq!(adapter.snapshot(), None);
    assert!(store.persisted_snapshot().unwrap().is_empty());
}

#[test]
fn test_json_file_roundtrip_across_store_instances() {
    let dir = temp_dir();
    let path = dir.path().join("frameworks.json");

    {
        let mut store = ComplianceStoreBuilder::new()
            .config(framework_config())
            .persistence(JsonFileAdapter::new(&path))
            .build(FrameworkState::default())
            .unwrap();
        store.replace(selected("iso27001"));
    }

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"selectedFramework": "iso27001"}));

    let restored = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(JsonFileAdapter::new(&path))
        .build(FrameworkState::default())
        .unwrap();
    assert_eq!(
        restored.state().selected_framework.as_deref(),
        Some("iso27001")
    );
    assert!(restored.state().frameworks.is_empty());
    assert!(restored.state().search_query.is_empty());
}

#[test]
fn test_sqlite_roundtrip_across_store_instances() {
    let dir = temp_dir();
    let db = dir.path().join("state.db");

    {
        let adapter = SqliteAdapter::open(&db, "frameworks").unwrap();
        let mut store = ComplianceStoreBuilder::new()
            .config(framework_config())
            .persistence(adapter)
            .build(FrameworkState::default())
            .unwrap();
        store.set(|s| {
            s.selected_framework = Some("soc2".into());
            s.search_query = "draft".into();
        });
    }

    let mut raw = SqliteAdapter::open(&db, "frameworks").unwrap();
    assert_eq!(
        raw.load().unwrap(),
        Some(object(json!({"selectedFramework": "soc2"})))
    );

    let restored = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(SqliteAdapter::open(&db, "frameworks").unwrap())
        .build(FrameworkState::default())
        .unwrap();
    assert_eq!(restored.state().selected_framework.as_deref(), Some("soc2"));
    assert!(restored.state().search_query.is_empty());

    // Another namespace in the same file starts empty.
    let other = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(SqliteAdapter::open(&db, "organizations").unwrap())
        .build(FrameworkState::default())
        .unwrap();
    assert_eq!(other.state().selected_framework, None);
}

#[test]
fn test_hydration_ignores_keys_outside_allow_list() {
    let adapter = MemoryAdapter::with_snapshot(object(json!({
        "selectedFramework": "gdpr",
        "searchQuery": "should not load",
        "_compliance": {"lockedRecords": ["x"]}
    })));
    let store = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(adapter)
        .build(FrameworkState::default())
        .unwrap();

    assert_eq!(store.state().selected_framework.as_deref(), Some("gdpr"));
    assert!(store.state().search_query.is_empty());
    assert!(!store.is_record_locked("x"));
}

#[test]
fn test_corrupt_file_does_not_block_construction() {
    let dir = temp_dir();
    let path = dir.path().join("frameworks.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let mut store = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(JsonFileAdapter::new(&path))
        .build(selected("hipaa"))
        .expect("hydration failure must not fail construction");
    assert_eq!(store.state().selected_framework.as_deref(), Some("hipaa"));

    // The next write repairs the file.
    store.set(|s| s.selected_framework = Some("pci".into()));
    let mut adapter = JsonFileAdapter::new(&path);
    assert_eq!(
        adapter.load().unwrap(),
        Some(object(json!({"selectedFramework": "pci"})))
    );
}

#[test]
fn test_explicit_persist_and_hydrate() {
    let adapter = MemoryAdapter::new();
    let mut store = ComplianceStoreBuilder::new()
        .config(framework_config())
        .persistence(adapter.clone())
        .build(selected("hipaa"))
        .unwrap();
    assert_eq!(adapter.snapshot(), None);

    store.persist().unwrap();
    assert_eq!(
        adapter.snapshot(),
        Some(object(json!({"selectedFramework": "hipaa"})))
    );

    let mut writer = adapter.clone();
    writer
        .save(&object(json!({"selectedFramework": "fedramp"})))
        .unwrap();
    assert!(store.hydrate().unwrap());
    assert_eq!(store.state().selected_framework.as_deref(), Some("fedramp"));
}

#[test]
fn test_sqlite_on_existing_empty_file() {
    let tmp = temp_db();
    let mut adapter = SqliteAdapter::open(tmp.path(), "auth").expect("should open state database");
    assert_eq!(adapter.load().unwrap(), None);

    let mut store = ComplianceStoreBuilder::new()
        .config(ComplianceConfig {
            persist_keys: vec!["frameworks".into()],
            ..Default::default()
        })
        .persistence(adapter)
        .build(FrameworkState::default())
        .unwrap();
    store.set(|s| s.frameworks = vec!["nist".into()]);

    let mut reader = SqliteAdapter::open(tmp.path(), "auth").unwrap();
    assert_eq!(reader.load().unwrap(), Some(object(json!({"frameworks": ["nist"]}))));
}

#[test]
fn test_sensitive_fields_cannot_be_allow_listed() {
    for key in ["ssn", "email"] {
        let config = ComplianceConfig {
            persist_keys: vec![key.into()],
            ..clinic_config()
        };
        let built = ComplianceStoreBuilder::new()
            .config(config)
            .persistence(MemoryAdapter::new())
            .build(PatientState::default());
        assert!(built.is_err(), "'{key}' should not be persistable");
    }

    let config = ComplianceConfig {
        persist_keys: vec!["patients".into()],
        ..clinic_config()
    };
    assert!(ComplianceStore::with_config(PatientState::default(), config).is_ok());
}

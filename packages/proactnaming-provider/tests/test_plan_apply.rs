//! Integration tests for plan / apply / refresh through the engine

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proactnaming_client::{
    IdentityComponents, IdentityField, InMemoryAuthority, MemoryOp, TransportErrorKind,
};
use proactnaming_provider::{
    ChangeAction, DeclaredName, DesiredResource, Engine, ErrorKind, FileStateStore, Manifest,
    MemoryStateStore, ProviderContext, StateStore, Value,
};
use tempfile::TempDir;

const ADDRESS: &str = "proactnaming_generate_name.web";

fn scenario() -> IdentityComponents {
    IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev")
}

fn desired(identity: &IdentityComponents) -> Vec<DesiredResource> {
    vec![DesiredResource::new(ADDRESS, DeclaredName::from_identity(identity))]
}

fn engine(authority: &InMemoryAuthority, store: Arc<dyn StateStore>) -> Engine {
    Engine::new(ProviderContext::new(Arc::new(authority.clone())), store)
}

#[tokio::test]
async fn test_instance_change_replaces_record() {
    let authority = InMemoryAuthority::new();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    engine.apply(&plan).await.unwrap();
    let first = store.get(ADDRESS).await.unwrap().unwrap();

    let mut changed = scenario();
    changed.instance = "999".to_string();
    let plan = engine.plan(&desired(&changed)).await.unwrap();
    assert_eq!(
        plan.changes[0].action,
        ChangeAction::Replace {
            fields: vec![IdentityField::Instance]
        }
    );

    let report = engine.apply(&plan).await.unwrap();
    assert!(report.is_success());

    let second = store.get(ADDRESS).await.unwrap().unwrap();
    assert_ne!(first.record_id(), second.record_id());
    assert!(second.resolved_name().contains("999"));
    assert_ne!(first.resolved_name(), second.resolved_name());
    assert!(!authority.contains(first.record_id()));
    assert!(authority.contains(second.record_id()));
}

#[tokio::test]
async fn test_uncreatable_replacement_keeps_prior_name() {
    let authority = InMemoryAuthority::new();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    engine.apply(&plan).await.unwrap();
    let before = store.get(ADDRESS).await.unwrap().unwrap();
    let retracts = authority.calls().retract;

    let declared =
        DeclaredName::from_identity(&scenario()).with(IdentityField::Location, Value::Unknown);
    let plan = engine
        .plan(&[DesiredResource::new(ADDRESS, declared)])
        .await
        .unwrap();
    assert_eq!(
        plan.changes[0].action,
        ChangeAction::Replace {
            fields: vec![IdentityField::Location]
        }
    );

    let report = engine.apply(&plan).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::ValidationFailed);
    assert_eq!(store.get(ADDRESS).await.unwrap(), Some(before.clone()));
    assert!(authority.contains(before.record_id()));
    assert_eq!(authority.calls().retract, retracts);
}

#[tokio::test]
async fn test_refresh_drops_vanished_and_next_apply_regenerates() {
    let authority = InMemoryAuthority::new();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    engine.apply(&plan).await.unwrap();
    let stale = store.get(ADDRESS).await.unwrap().unwrap().record_id();
    authority.remove_row(stale);

    let report = engine.refresh().await.unwrap();
    assert_eq!(report.vanished, vec![ADDRESS.to_string()]);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(store.get(ADDRESS).await.unwrap().is_none());

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    assert_eq!(plan.changes[0].action, ChangeAction::Create);
    engine.apply(&plan).await.unwrap();

    let fresh = store.get(ADDRESS).await.unwrap().unwrap().record_id();
    assert_ne!(fresh, stale);
}

#[tokio::test]
async fn test_refresh_failure_keeps_stored_state() {
    let authority = InMemoryAuthority::new();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    engine.apply(&plan).await.unwrap();
    let before = store.get(ADDRESS).await.unwrap();

    authority.fail_next(MemoryOp::Lookup, TransportErrorKind::Unauthorized);
    let report = engine.refresh().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::AuthenticationFailed);
    assert_eq!(store.get(ADDRESS).await.unwrap(), before);
}

#[tokio::test]
async fn test_destroy_all_orphans_when_retract_unsupported() {
    let authority = InMemoryAuthority::without_retract();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    engine.apply(&plan).await.unwrap();
    // The preview row could not be retracted either.
    assert_eq!(authority.rows().len(), 2);

    let report = engine.destroy_all().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].is_warning());
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(authority.rows().len(), 2);
}

#[tokio::test]
async fn test_create_failure_persists_nothing() {
    let authority = InMemoryAuthority::new();
    let store = MemoryStateStore::new();
    let engine = engine(&authority, Arc::new(store.clone()));

    let plan = engine.plan(&desired(&scenario())).await.unwrap();
    authority.fail_next(MemoryOp::Generate, TransportErrorKind::Connection);

    let report = engine.apply(&plan).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::ConnectionError);
    assert!(store.list().await.unwrap().is_empty());
    assert!(authority.rows().is_empty());
}

#[tokio::test]
async fn test_manifest_to_file_state() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("proactnaming.state.json");
    let manifest = Manifest::from_yaml_str(
        r#"
version: 1
resources:
  web:
    organization: man
    resource_type: st
    application: webapp
    instance: "001"
    location: euw
    environment: dev
  vault:
    organization: man
    resource_type: kv
    application: webapp
    function: sec
    instance: "001"
    location: euw
    environment: dev
"#,
    )
    .unwrap();

    let authority = InMemoryAuthority::new();
    let engine = engine(&authority, Arc::new(FileStateStore::new(&state_path)));
    let plan = engine.plan(&manifest.desired()).await.unwrap();
    assert_eq!(plan.summary().create, 2);

    let report = engine.apply(&plan).await.unwrap();
    assert!(report.is_success());

    let stored = FileStateStore::new(&state_path).list().await.unwrap();
    let names: Vec<_> = stored.values().map(|m| m.resolved_name().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "man-kv-webapp-sec-001-euw-dev".to_string(),
            "man-st-webapp-001-euw-dev".to_string(),
        ]
    );

    let report = engine.destroy_all().await.unwrap();
    assert!(report.is_success());
    assert!(FileStateStore::new(&state_path).list().await.unwrap().is_empty());
    assert!(authority.rows().is_empty());
}

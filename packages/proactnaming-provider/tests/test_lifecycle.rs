//! Integration tests for the name lifecycle
//!
//! Drives the reconciler and preview engine against the in-memory authority:
//! - Scenario names and refresh idempotence
//! - Orphan recovery after out-of-band deletion
//! - Preview non-persistence
//! - Destroy when the authority refuses deletion

use std::sync::Arc;

use proactnaming_client::{IdentityComponents, IdentityField, InMemoryAuthority};
use proactnaming_provider::{
    Binding, DeclaredName, DestroyOutcome, LifecycleReconciler, PlanIntent, PreviewEngine,
    ProviderContext, RefreshOutcome,
};

fn scenario() -> IdentityComponents {
    IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev")
}

fn context(authority: &InMemoryAuthority) -> ProviderContext {
    ProviderContext::new(Arc::new(authority.clone()))
}

#[tokio::test]
async fn test_scenario_generate_then_refresh_same_name() {
    let authority = InMemoryAuthority::new();
    let reconciler = LifecycleReconciler::new(context(&authority));

    let binding = reconciler
        .create(Binding::Unbound, &DeclaredName::from_identity(&scenario()))
        .await
        .expect("create failed");
    let name = binding.managed().unwrap().resolved_name().to_string();
    assert!(name.starts_with("man-st-webapp"));
    assert!(name.ends_with("-euw-dev"));

    let mut current = binding.clone();
    for _ in 0..3 {
        current = reconciler.refresh(&current).await.unwrap().into_binding();
        assert_eq!(current.record_id(), binding.record_id());
        assert_eq!(current.managed().unwrap().resolved_name(), name);
    }
    assert_eq!(authority.calls().generate, 1);
    assert_eq!(authority.calls().retract, 0);
}

#[tokio::test]
async fn test_vanished_record_is_regenerated_with_fresh_id() {
    let authority = InMemoryAuthority::new();
    let reconciler = LifecycleReconciler::new(context(&authority));
    let declared = DeclaredName::from_identity(&scenario());

    let binding = reconciler.create(Binding::Unbound, &declared).await.unwrap();
    let stale_id = binding.record_id().unwrap();
    authority.remove_row(stale_id);

    let outcome = reconciler.refresh(&binding).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Vanished { .. }));

    let rebound = reconciler
        .create(outcome.into_binding(), &declared)
        .await
        .unwrap();
    assert_ne!(rebound.record_id(), Some(stale_id));
    assert_eq!(authority.calls().generate, 2);
}

#[tokio::test]
async fn test_preview_row_not_listed_afterwards() {
    let authority = InMemoryAuthority::new();
    let preview = PreviewEngine::new(context(&authority))
        .preview(&DeclaredName::from_identity(&scenario()), PlanIntent::Create)
        .await;
    assert!(preview.resolved_name.is_known());

    assert!(authority.rows().is_empty());

    let reconciler = LifecycleReconciler::new(context(&authority));
    let binding = reconciler
        .create(Binding::Unbound, &DeclaredName::from_identity(&scenario()))
        .await
        .unwrap();
    let rows = authority.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(Some(rows[0].record_id), binding.record_id());
}

#[tokio::test]
async fn test_destroy_without_retract_support_warns() {
    let authority = InMemoryAuthority::without_retract();
    let reconciler = LifecycleReconciler::new(context(&authority));
    let binding = reconciler
        .create(Binding::Unbound, &DeclaredName::from_identity(&scenario()))
        .await
        .unwrap();

    let outcome = reconciler.destroy(&binding).await.expect("destroy must not fail");
    match &outcome {
        DestroyOutcome::Orphaned { diagnostic, .. } => {
            assert!(diagnostic.is_warning());
            assert!(diagnostic.detail.contains("admin password"));
        }
        other => panic!("expected orphaned outcome, got {other:?}"),
    }
    assert!(authority.contains(outcome.record_id()));
}

#[tokio::test]
async fn test_identity_change_is_never_an_update() {
    let authority = InMemoryAuthority::new();
    let reconciler = LifecycleReconciler::new(context(&authority));
    let binding = reconciler
        .create(Binding::Unbound, &DeclaredName::from_identity(&scenario()))
        .await
        .unwrap();
    let changed = DeclaredName::from_identity(&scenario()).with(IdentityField::Instance, "999".into());

    assert!(reconciler
        .update("proactnaming_generate_name.web", &binding, &changed)
        .await
        .is_err());

    let outcome = reconciler.destroy(&binding).await.unwrap();
    assert!(matches!(outcome, DestroyOutcome::Retracted { .. }));
    let replacement = reconciler.create(Binding::Unbound, &changed).await.unwrap();

    let new_name = replacement.managed().unwrap().resolved_name();
    assert!(new_name.contains("999"));
    assert_ne!(new_name, binding.managed().unwrap().resolved_name());
}

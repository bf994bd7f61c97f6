use super::common::*;
use crate::models::domain::{AuditAction, RiskTier, TenantContext, TierId};
use crate::models::service::ModelServiceError;
use crate::models::store::StoreError;

#[test]
fn another_tenants_model_is_indistinguishable_from_a_missing_one() {
    let harness = build_harness();
    let model = configured_model(&harness, "Vendor AML");

    let outsider = TenantContext::new("globex", "auditor-1");
    match harness.service.model_detail(&outsider, &model.id) {
        Err(ModelServiceError::Store(StoreError::NotFound)) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
    match harness.service.publish(&outsider, &model.id) {
        Err(ModelServiceError::Store(StoreError::NotFound)) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
    match harness.service.delete_model(&outsider, &model.id) {
        Err(ModelServiceError::Store(StoreError::NotFound)) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn listing_only_returns_the_callers_models() {
    let harness = build_harness();
    configured_model(&harness, "Vendor AML");

    let outsider = TenantContext::new("globex", "auditor-1");
    assert!(harness.service.models(&outsider).expect("list").is_empty());
    assert_eq!(harness.service.models(&ctx()).expect("list").len(), 1);
}

#[test]
fn tier_labels_are_tenant_scoped_and_upserted_by_id() {
    let harness = build_harness();
    let label = RiskTier {
        id: TierId("tier-low".to_string()),
        name: "Low".to_string(),
        foreground: "#1b5e20".to_string(),
        background: "#e8f5e9".to_string(),
    };
    harness
        .service
        .save_tier_label(&ctx(), label.clone())
        .expect("label saved");

    let renamed = RiskTier {
        name: "Low risk".to_string(),
        ..label
    };
    harness
        .service
        .save_tier_label(&ctx(), renamed.clone())
        .expect("label replaced");

    let labels = harness.service.tier_labels(&ctx()).expect("labels read");
    assert_eq!(labels, vec![renamed]);

    let outsider = TenantContext::new("globex", "auditor-1");
    assert!(harness
        .service
        .tier_labels(&outsider)
        .expect("labels read")
        .is_empty());
}

#[test]
fn every_lifecycle_operation_leaves_an_audit_entry() {
    let harness = build_harness();
    let model = configured_model(&harness, "Vendor AML");
    harness
        .service
        .start_test(&ctx(), &model.id)
        .expect("test run starts");
    harness
        .service
        .publish(&ctx(), &model.id)
        .expect("publishes");
    harness
        .service
        .disable(&ctx(), &model.id)
        .expect("disables");
    harness.service.enable(&ctx(), &model.id).expect("enables");
    let clone = harness
        .service
        .clone_model(&ctx(), &model.id)
        .expect("clone created");
    harness
        .service
        .delete_model(&ctx(), &clone.id)
        .expect("clone deleted");

    let actions: Vec<AuditAction> = harness
        .audit
        .events()
        .iter()
        .map(|event| event.action)
        .collect();
    for expected in [
        AuditAction::Created,
        AuditAction::TiersReplaced,
        AuditAction::FactorSaved,
        AuditAction::TestStarted,
        AuditAction::Published,
        AuditAction::Disabled,
        AuditAction::Enabled,
        AuditAction::Cloned,
        AuditAction::Deleted,
    ] {
        assert!(
            actions.contains(&expected),
            "missing audit action {expected:?} in {actions:?}"
        );
    }

    let event = &harness.audit.events()[0];
    assert_eq!(event.tenant.0, "acme");
    assert_eq!(event.user.0, "analyst-7");
}

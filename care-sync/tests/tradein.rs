mod common;

use std::sync::atomic::Ordering;

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{Condition, EvaluationStatus, Mattress};
use shared::util::DAY_MS;

use care_sync::error::ServiceError;
use care_sync::store::{Collection, coupons, evaluations};
use care_sync::tradein::{self, EvaluationCreate};
use common::Harness;

const NOW: i64 = 1_700_000_000_000;

fn request(customer_id: &str, value: f64, condition: Condition) -> EvaluationCreate {
    EvaluationCreate {
        customer_id: customer_id.into(),
        mattress: Mattress {
            brand: "Restwell".into(),
            model: "Cloud 12".into(),
            age: 4,
            condition,
            size: "queen".into(),
        },
        estimated_value: value,
    }
}

fn app_code(err: ServiceError) -> ErrorCode {
    AppError::from(err).code
}

async fn pending(h: &Harness, value: f64, condition: Condition) -> String {
    tradein::create_evaluation(h.store(), &request("c1", value, condition))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_credit_follows_condition() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;

    let good = tradein::create_evaluation(h.store(), &request("c1", 1000.0, Condition::Good))
        .await
        .unwrap();
    assert_eq!(good.credit_approved, 600);
    assert_eq!(good.status, EvaluationStatus::Pending);

    let poor = tradein::create_evaluation(h.store(), &request("c1", 1000.0, Condition::Poor))
        .await
        .unwrap();
    assert_eq!(poor.credit_approved, 200);
}

#[tokio::test]
async fn test_create_requires_known_customer_and_valid_value() {
    let h = Harness::new();
    let err = tradein::create_evaluation(h.store(), &request("ghost", 100.0, Condition::Good))
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::CustomerNotFound);

    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let err = tradein::create_evaluation(h.store(), &request("c1", -1.0, Condition::Good))
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_approve_issues_coupon_locally_and_remotely() {
    let h = Harness::new();
    h.insert(
        Collection::Customers,
        json!({"id": "c1", "email": "a@x.com", "commerce_customer_id": "77"}),
    )
    .await;
    let id = pending(&h, 1000.0, Condition::Good).await;

    let outcome = tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap();
    assert!(outcome.remote_error.is_none());

    let evaluation = outcome.evaluation;
    assert_eq!(evaluation.status, EvaluationStatus::Approved);
    assert_eq!(evaluation.coupon_id.as_deref(), Some(outcome.coupon.id.as_str()));
    assert_eq!(evaluation.expires_at, Some(NOW + 90 * DAY_MS));
    let code = evaluation.coupon_code.clone().unwrap();
    assert!(code.starts_with("TRADEIN-"));

    let coupon = coupons::find_by_code(h.store(), &code).await.unwrap().unwrap();
    assert_eq!(coupon.value, 600.0);
    assert_eq!(coupon.usage_limit, 1);
    assert!(coupon.active);
    assert!(coupon.commerce_price_rule_id.is_some());
    assert!(coupon.commerce_discount_code_id.is_some());
    assert!(coupon.orphaned_price_rule_id.is_none());

    let rules = h.commerce.created_rules.lock().unwrap().clone();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].value, "-600.0");
    assert_eq!(rules[0].prerequisite_customer_ids, vec![77]);
    assert_eq!(h.commerce.created_codes.lock().unwrap().clone(), vec![code]);
}

#[tokio::test]
async fn test_storefront_failure_keeps_local_approval() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let id = pending(&h, 500.0, Condition::Fair).await;
    h.commerce.fail_code.store(true, Ordering::SeqCst);

    let outcome = tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap();
    assert!(outcome.remote_error.is_some());
    assert_eq!(outcome.evaluation.status, EvaluationStatus::Approved);

    let coupon = coupons::get(h.store(), &outcome.coupon.id).await.unwrap().unwrap();
    assert!(coupon.active);
    assert_eq!(coupon.value, 200.0);
    assert!(coupon.description.unwrap().contains("storefront sync failed"));
    assert!(coupon.commerce_price_rule_id.is_none());
    // The rule was rolled back remotely, so nothing is orphaned
    assert!(coupon.orphaned_price_rule_id.is_none());
    assert_eq!(h.commerce.deleted_rules().len(), 1);
}

#[tokio::test]
async fn test_failed_rollback_records_orphan() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let id = pending(&h, 500.0, Condition::Fair).await;
    h.commerce.fail_code.store(true, Ordering::SeqCst);
    h.commerce.fail_delete.store(true, Ordering::SeqCst);

    let outcome = tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap();
    assert!(outcome.remote_error.is_some());
    let coupon = coupons::get(h.store(), &outcome.coupon.id).await.unwrap().unwrap();
    assert!(coupon.orphaned_price_rule_id.is_some());

    // Conflict resolution finishes the cleanup once the storefront recovers
    h.commerce.fail_delete.store(false, Ordering::SeqCst);
    let report = h.state.resolve_conflicts().await.unwrap();
    assert_eq!(report.cleaned_orphans, 1);
}

#[tokio::test]
async fn test_transitions_are_forward_only() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let id = pending(&h, 800.0, Condition::Excellent).await;

    tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap();
    let err = tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap_err();
    assert_eq!(app_code(err), ErrorCode::InvalidEvaluationTransition);

    let err = tradein::reject(h.store(), &id).await.unwrap_err();
    assert_eq!(app_code(err), ErrorCode::InvalidEvaluationTransition);

    let err = tradein::reject(h.store(), "missing").await.unwrap_err();
    assert_eq!(app_code(err), ErrorCode::EvaluationNotFound);
}

#[tokio::test]
async fn test_redeem_moves_approved_to_redeemed_once() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let id = pending(&h, 1000.0, Condition::Good).await;
    let approved = tradein::approve(h.store(), h.commerce.as_ref(), &id, NOW)
        .await
        .unwrap();
    let code = approved.coupon.code.clone();

    let first = tradein::redeem_code(h.store(), &code, NOW + 1).await.unwrap();
    assert!(first.redeemed);
    let evaluation = first.evaluation.unwrap();
    assert_eq!(evaluation.status, EvaluationStatus::Redeemed);
    assert_eq!(evaluation.redeemed_at, Some(NOW + 1));
    let coupon = first.coupon.unwrap();
    assert_eq!(coupon.usage_count, 1);
    assert!(!coupon.active);

    let second = tradein::redeem_code(h.store(), &code, NOW + 2).await.unwrap();
    assert!(!second.redeemed);
    assert_eq!(second.coupon.unwrap().usage_count, 1);
    let evaluation = evaluations::get(h.store(), &id).await.unwrap().unwrap();
    assert_eq!(evaluation.redeemed_at, Some(NOW + 1));
}

#[tokio::test]
async fn test_rejected_evaluation_is_never_redeemed() {
    let h = Harness::new();
    h.insert_customer("c1", "a@x.com", 1_000, None).await;
    let id = pending(&h, 1000.0, Condition::Good).await;
    tradein::reject(h.store(), &id).await.unwrap();

    // A code pointing at the rejected evaluation shows up on an order
    h.insert(
        Collection::Coupons,
        json!({
            "id": "cp-stray",
            "code": "TRADEIN-STRAY-1",
            "evaluation_id": id,
            "value": 600.0,
            "active": true,
        }),
    )
    .await;

    let outcome = tradein::redeem_code(h.store(), "TRADEIN-STRAY-1", NOW)
        .await
        .unwrap();
    assert!(!outcome.redeemed);
    let evaluation = evaluations::get(h.store(), &id).await.unwrap().unwrap();
    assert_eq!(evaluation.status, EvaluationStatus::Rejected);
    assert!(evaluation.redeemed_at.is_none());
}

#[tokio::test]
async fn test_unknown_code_is_ignored() {
    let h = Harness::new();
    let outcome = tradein::redeem_code(h.store(), "SUMMER10", NOW).await.unwrap();
    assert!(outcome.coupon.is_none());
    assert!(outcome.evaluation.is_none());
    assert!(!outcome.redeemed);
}

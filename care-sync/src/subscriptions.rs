//! Subscription lifecycle
//!
//! Status changes on a subscription that is linked to the payments provider
//! are made remotely first; the local record only changes once the provider
//! accepted the change.

use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::{Billing, Plan, Subscription, SubscriptionStatus};

use crate::error::{ProviderResult, ServiceResult};
use crate::payments::{PaymentsApi, SubscriptionAction};
use crate::plans::PlanCatalog;
use crate::store::{RecordStore, subscriptions};

fn subscription_not_found(id: &str) -> AppError {
    AppError::with_message(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription {id} not found"),
    )
}

async fn load(store: &dyn RecordStore, id: &str) -> ServiceResult<Subscription> {
    Ok(subscriptions::get(store, id)
        .await?
        .ok_or_else(|| subscription_not_found(id))?)
}

/// Timestamps that accompany a status change
fn status_patch(target: SubscriptionStatus, now: i64) -> Value {
    match target {
        SubscriptionStatus::Paused => json!({ "status": target, "paused_at": now }),
        SubscriptionStatus::Cancelled => json!({ "status": target, "cancelled_at": now }),
        SubscriptionStatus::Active | SubscriptionStatus::Inactive => {
            json!({ "status": target, "paused_at": null })
        }
    }
}

/// Create a subscription priced from the current catalog
pub async fn create_from_plan(
    store: &dyn RecordStore,
    plans: &PlanCatalog,
    customer_id: &str,
    plan: Plan,
    payments_subscription_id: Option<&str>,
    now: i64,
) -> ServiceResult<Subscription> {
    let terms = plans.terms(plan).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::UnknownPlan,
            format!("Plan {} is not in the catalog", plan.as_str()),
        )
    })?;

    let billing = Billing {
        method: String::from(if payments_subscription_id.is_some() { "card" } else { "manual" }),
        ..Billing::default()
    };
    let subscription = subscriptions::create(
        store,
        &json!({
            "customer_id": customer_id,
            "plan": plan,
            "status": SubscriptionStatus::Active,
            "pricing": terms.pricing,
            "billing": billing,
            "services": terms.services,
            "credits": { "cleanings_used": 0, "inspections_used": 0 },
            "plan_version": plans.version,
            "payments_subscription_id": payments_subscription_id,
            "start_date": now,
        }),
    )
    .await?;
    tracing::info!(
        subscription_id = %subscription.id,
        customer_id,
        plan = plan.as_str(),
        plan_version = plans.version,
        "Subscription created"
    );
    Ok(subscription)
}

/// Operator status change
pub async fn change_status(
    store: &dyn RecordStore,
    payments: &dyn PaymentsApi,
    subscription_id: &str,
    target: SubscriptionStatus,
    now: i64,
) -> ServiceResult<Subscription> {
    let subscription = load(store, subscription_id).await?;
    if !subscription.status.can_transition_to(target) {
        return Err(AppError::invalid_subscription_transition(
            subscription.status.as_str(),
            target.as_str(),
        )
        .into());
    }

    if let Some(remote_id) = subscription.payments_subscription_id.as_deref() {
        let action = match target {
            SubscriptionStatus::Active => Some(SubscriptionAction::Resume),
            SubscriptionStatus::Paused => Some(SubscriptionAction::Pause),
            SubscriptionStatus::Cancelled => Some(SubscriptionAction::Cancel),
            // Billing failure state; the provider decides it, nothing to push
            SubscriptionStatus::Inactive => None,
        };
        if let Some(action) = action {
            payments
                .update_subscription_status(remote_id, action)
                .await
                .map_err(|e| {
                    tracing::error!(subscription_id, payments_subscription_id = remote_id, error = %e, "Remote status change failed");
                    AppError::with_message(ErrorCode::PaymentsProviderError, e.to_string())
                })?;
        }
    }

    let updated = subscriptions::update(store, &subscription.id, status_patch(target, now)).await?;
    tracing::info!(
        subscription_id,
        from = subscription.status.as_str(),
        to = target.as_str(),
        "Subscription status changed"
    );

    if target == SubscriptionStatus::Cancelled {
        if let Some(link_id) = updated.billing.payment_link_id.as_deref() {
            if let Err(e) = payments.update_payment_link(link_id, false).await {
                tracing::warn!(subscription_id, link_id, error = %e, "Failed to deactivate payment link");
            }
        }
    }
    Ok(updated)
}

/// Create a payment link for the subscription's plan and store its URL
pub async fn create_payment_link(
    store: &dyn RecordStore,
    payments: &dyn PaymentsApi,
    plans: &PlanCatalog,
    subscription_id: &str,
) -> ServiceResult<Subscription> {
    let subscription = load(store, subscription_id).await?;
    if subscription.status == SubscriptionStatus::Cancelled {
        return Err(AppError::invalid_request("Subscription is cancelled").into());
    }

    let price_id = plans
        .terms(subscription.plan)
        .and_then(|t| t.payments_price_id.as_deref())
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::UnknownPlan,
                format!("No payments price configured for plan {}", subscription.plan.as_str()),
            )
        })?;
    if plans.version != subscription.plan_version {
        tracing::warn!(
            subscription_id,
            plan_version = subscription.plan_version,
            catalog_version = plans.version,
            "Payment link uses a newer catalog price than the subscription was created with"
        );
    }

    let link = payments
        .create_payment_link(
            price_id,
            &[
                ("subscription_id", subscription.id.as_str()),
                ("customer_id", subscription.customer_id.as_str()),
                ("plan", subscription.plan.as_str()),
            ],
        )
        .await
        .map_err(|e| AppError::with_message(ErrorCode::PaymentsProviderError, e.to_string()))?;

    let billing = Billing {
        payment_link_id: Some(link.id),
        payment_link_url: Some(link.url),
        ..subscription.billing
    };
    let updated = subscriptions::update(store, &subscription.id, json!({ "billing": billing })).await?;
    tracing::info!(subscription_id, "Payment link created");
    Ok(updated)
}

/// Apply a status reported by the payments provider.
///
/// Returns the updated subscription, or `None` when nothing changed. A
/// locally cancelled subscription is never revived by a remote status.
pub async fn apply_remote_status(
    store: &dyn RecordStore,
    subscription: &Subscription,
    target: SubscriptionStatus,
    now: i64,
) -> ProviderResult<Option<Subscription>> {
    if !subscription.status.can_transition_to(target) {
        return Ok(None);
    }
    let updated = subscriptions::update(store, &subscription.id, status_patch(target, now)).await?;
    tracing::info!(
        subscription_id = %subscription.id,
        from = subscription.status.as_str(),
        to = target.as_str(),
        "Subscription status updated from payments provider"
    );
    Ok(Some(updated))
}

/// Record a successful payment
pub async fn record_payment(
    store: &dyn RecordStore,
    subscription: &Subscription,
    paid_at: i64,
) -> ProviderResult<Subscription> {
    let billing = Billing {
        last_payment: Some(paid_at),
        ..subscription.billing.clone()
    };
    let mut patch = json!({ "billing": billing });
    if subscription.status.can_transition_to(SubscriptionStatus::Active) {
        patch["status"] = json!(SubscriptionStatus::Active);
        patch["paused_at"] = Value::Null;
    }
    subscriptions::update(store, &subscription.id, patch).await
}

//! Payments provider events

use serde_json::Value;
use shared::models::{CustomerCreate, EntityType, Plan, SubscriptionStatus};
use shared::util::now_millis;

use super::event_object;
use crate::error::ServiceResult;
use crate::reconcile::Reconciler;
use crate::store::{customers, mappings, subscriptions};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
pub const INVOICE_PAID: &str = "invoice.paid";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

/// Dispatch by event type; `Ok(false)` when the type is not handled
pub async fn handle(ctx: &Reconciler, event_type: &str, payload: &Value) -> ServiceResult<bool> {
    let Some(obj) = event_object(payload) else {
        tracing::warn!(event_type, "Payments event without data.object");
        return Ok(false);
    };

    match event_type {
        CHECKOUT_COMPLETED => checkout_completed(ctx, obj).await,
        SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => {
            subscription_changed(ctx, obj, event_type == SUBSCRIPTION_CREATED).await
        }
        SUBSCRIPTION_DELETED => {
            subscription_status(ctx, obj["id"].as_str(), SubscriptionStatus::Cancelled).await
        }
        INVOICE_PAYMENT_SUCCEEDED | INVOICE_PAID => invoice_paid(ctx, obj).await,
        INVOICE_PAYMENT_FAILED => {
            subscription_status(ctx, obj["subscription"].as_str(), SubscriptionStatus::Inactive).await
        }
        _ => {
            tracing::debug!(event_type, "Unhandled payments event type");
            Ok(false)
        }
    }
}

fn plan_from_metadata(obj: &Value) -> Plan {
    obj.get("metadata")
        .and_then(|m| m["plan"].as_str())
        .and_then(Plan::parse)
        .unwrap_or(Plan::Basic)
}

/// Split "Jane Q Doe" into ("Jane", "Q Doe")
fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// checkout.session.completed: customer by email, subscription from the plan
async fn checkout_completed(ctx: &Reconciler, obj: &Value) -> ServiceResult<bool> {
    let store = ctx.store();
    let now = now_millis();
    let payments_customer = obj["customer"].as_str();
    let email = obj["customer_details"]["email"]
        .as_str()
        .or_else(|| obj["customer_email"].as_str());

    let existing = match payments_customer {
        Some(pid) => customers::find_linked_to_payments(store, pid).await?,
        None => None,
    };
    let customer = match (existing, email) {
        (Some(customer), _) => match payments_customer {
            // Linked only through the mapping; put the id back on the record
            Some(pid) if customer.payments_customer_id.is_none() => {
                customers::set_external_ids(store, &customer.id, Some(pid), None).await?
            }
            _ => customer,
        },
        (None, Some(email)) => {
            let (first_name, last_name) =
                split_name(obj["customer_details"]["name"].as_str().unwrap_or_default());
            let incoming = CustomerCreate {
                email: email.trim().to_string(),
                first_name,
                last_name,
                payments_customer_id: payments_customer.map(String::from),
                commerce_customer_id: None,
            };
            let (customer, created) = customers::upsert_by_email(store, &incoming).await?;
            if created {
                tracing::info!(customer_id = %customer.id, "Customer created from checkout");
            }
            customer
        }
        (None, None) => {
            tracing::warn!("Checkout completed without customer or email");
            return Ok(false);
        }
    };

    mappings::upsert(
        store,
        EntityType::Customer,
        &customer.id,
        customer.payments_customer_id.as_deref(),
        customer.commerce_customer_id.as_deref(),
        now,
    )
    .await?;

    let Some(remote_subscription) = obj["subscription"].as_str() else {
        // One-off payment
        return Ok(true);
    };
    let subscription = match subscriptions::find_by_payments_id(store, remote_subscription).await? {
        Some(existing) => existing,
        None => {
            crate::subscriptions::create_from_plan(
                store,
                ctx.plans(),
                &customer.id,
                plan_from_metadata(obj),
                Some(remote_subscription),
                now,
            )
            .await?
        }
    };
    mappings::upsert(
        store,
        EntityType::Subscription,
        &subscription.id,
        Some(remote_subscription),
        None,
        now,
    )
    .await?;
    Ok(true)
}

/// customer.subscription.created|updated
async fn subscription_changed(ctx: &Reconciler, obj: &Value, created: bool) -> ServiceResult<bool> {
    let store = ctx.store();
    let now = now_millis();
    let Some(remote_id) = obj["id"].as_str() else {
        return Ok(false);
    };
    let target = SubscriptionStatus::from_payments(obj["status"].as_str().unwrap_or_default());

    let local = match subscriptions::find_by_payments_id(store, remote_id).await? {
        Some(local) => local,
        None if created => {
            // Subscriptions started outside checkout; only for known customers
            let owner = match obj["customer"].as_str() {
                Some(pid) => customers::find_linked_to_payments(store, pid).await?,
                None => None,
            };
            let Some(owner) = owner else {
                tracing::debug!(payments_subscription_id = remote_id, "Subscription for unknown customer, ignoring");
                return Ok(false);
            };
            crate::subscriptions::create_from_plan(
                store,
                ctx.plans(),
                &owner.id,
                plan_from_metadata(obj),
                Some(remote_id),
                now,
            )
            .await?
        }
        None => {
            tracing::debug!(payments_subscription_id = remote_id, "Update for unknown subscription, ignoring");
            return Ok(false);
        }
    };

    crate::subscriptions::apply_remote_status(store, &local, target, now).await?;
    mappings::upsert(store, EntityType::Subscription, &local.id, Some(remote_id), None, now).await?;
    Ok(true)
}

async fn subscription_status(
    ctx: &Reconciler,
    remote_id: Option<&str>,
    target: SubscriptionStatus,
) -> ServiceResult<bool> {
    let Some(remote_id) = remote_id else {
        return Ok(false);
    };
    let Some(local) = subscriptions::find_by_payments_id(ctx.store(), remote_id).await? else {
        tracing::debug!(payments_subscription_id = remote_id, "Event for unknown subscription, ignoring");
        return Ok(false);
    };
    crate::subscriptions::apply_remote_status(ctx.store(), &local, target, now_millis()).await?;
    Ok(true)
}

/// invoice.payment_succeeded / invoice.paid
async fn invoice_paid(ctx: &Reconciler, obj: &Value) -> ServiceResult<bool> {
    let Some(remote_id) = obj["subscription"].as_str() else {
        return Ok(false);
    };
    let Some(local) = subscriptions::find_by_payments_id(ctx.store(), remote_id).await? else {
        tracing::debug!(payments_subscription_id = remote_id, "Invoice for unknown subscription, ignoring");
        return Ok(false);
    };
    // Provider timestamps are seconds
    let paid_at = obj["status_transitions"]["paid_at"]
        .as_i64()
        .map(|s| s * 1000)
        .unwrap_or_else(now_millis);
    crate::subscriptions::record_payment(ctx.store(), &local, paid_at).await?;
    tracing::info!(subscription_id = %local.id, "Payment recorded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_metadata_defaults_to_basic() {
        assert_eq!(plan_from_metadata(&json!({"metadata": {"plan": "elite"}})), Plan::Elite);
        assert_eq!(plan_from_metadata(&json!({"metadata": {"plan": "gold"}})), Plan::Basic);
        assert_eq!(plan_from_metadata(&json!({})), Plan::Basic);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Jane Q Doe"), ("Jane".into(), "Q Doe".into()));
        assert_eq!(split_name(" Cher "), ("Cher".into(), String::new()));
    }
}

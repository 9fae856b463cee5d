//! Storefront webhook topics

use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{Customer, CustomerCreate, EntityType};
use shared::util::now_millis;

use crate::commerce::{RemoteCustomer, RemoteOrder, RemoteProduct};
use crate::error::{ProviderResult, ServiceResult};
use crate::reconcile::Reconciler;
use crate::store::{RecordStore, customers, mappings, products};
use crate::tradein;

/// Delivery id used for dedup: the webhook id header when present,
/// otherwise `topic:resource id:updated_at`.
pub fn event_id(header: Option<&str>, topic: &str, payload: &Value) -> String {
    if let Some(id) = header.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    let resource = match &payload["id"] {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    };
    let updated_at = payload["updated_at"].as_str().unwrap_or_default();
    format!("{topic}:{resource}:{updated_at}")
}

fn parse<T: serde::de::DeserializeOwned>(topic: &str, payload: &Value) -> Result<T, AppError> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        AppError::with_message(ErrorCode::WebhookPayloadInvalid, format!("{topic}: {e}"))
    })
}

/// Dispatch by topic; `Ok(false)` when the topic has no effect
pub async fn handle(ctx: &Reconciler, topic: &str, payload: &Value) -> ServiceResult<bool> {
    match topic {
        "products/create" | "products/update" => {
            let product: RemoteProduct = parse(topic, payload)?;
            upsert_product(ctx, &product).await
        }
        "customers/create" | "customers/update" => {
            let customer: RemoteCustomer = parse(topic, payload)?;
            upsert_customer(ctx, &customer).await
        }
        "orders/create" => {
            let order: RemoteOrder = parse(topic, payload)?;
            redeem_order_codes(ctx, &order).await
        }
        // Redemption happens once, on create
        "orders/updated" => Ok(false),
        _ => {
            tracing::debug!(topic, "Unhandled storefront topic");
            Ok(false)
        }
    }
}

async fn upsert_product(ctx: &Reconciler, product: &RemoteProduct) -> ServiceResult<bool> {
    let commerce_id = product.id.to_string();
    let local = products::upsert_from_commerce(
        ctx.store(),
        &commerce_id,
        &product.title,
        product.price(),
        product.status.as_deref(),
    )
    .await?;
    mappings::upsert(
        ctx.store(),
        EntityType::Product,
        &local.id,
        None,
        Some(&commerce_id),
        now_millis(),
    )
    .await?;
    Ok(true)
}

async fn upsert_customer(ctx: &Reconciler, remote: &RemoteCustomer) -> ServiceResult<bool> {
    Ok(link_storefront_customer(ctx.store(), remote).await?.is_some())
}

/// Storefront customer -> local customer, and refresh its mapping.
///
/// A customer already linked to the storefront id wins, so an email changed
/// on the storefront does not spawn a second customer. Otherwise the match is
/// by email, creating the customer if absent. `None` for an unlinked
/// customer without an email.
pub async fn link_storefront_customer(
    store: &dyn RecordStore,
    remote: &RemoteCustomer,
) -> ProviderResult<Option<Customer>> {
    let commerce_id = remote.id.to_string();
    let local = match customers::find_linked_to_commerce(store, &commerce_id).await? {
        Some(linked) if linked.commerce_customer_id.is_none() => {
            customers::set_external_ids(store, &linked.id, None, Some(&commerce_id)).await?
        }
        Some(linked) => linked,
        None => {
            let Some(email) = remote.email.as_deref().filter(|e| !e.trim().is_empty()) else {
                tracing::debug!(commerce_customer_id = remote.id, "Storefront customer without email, ignoring");
                return Ok(None);
            };
            let incoming = CustomerCreate {
                email: email.trim().to_string(),
                first_name: remote.first_name.clone().unwrap_or_default(),
                last_name: remote.last_name.clone().unwrap_or_default(),
                payments_customer_id: None,
                commerce_customer_id: Some(commerce_id.clone()),
            };
            let (local, created) = customers::upsert_by_email(store, &incoming).await?;
            if created {
                tracing::info!(customer_id = %local.id, commerce_customer_id = remote.id, "Customer created from storefront");
            }
            local
        }
    };
    mappings::upsert(
        store,
        EntityType::Customer,
        &local.id,
        local.payments_customer_id.as_deref(),
        local.commerce_customer_id.as_deref(),
        now_millis(),
    )
    .await?;
    Ok(Some(local))
}

async fn redeem_order_codes(ctx: &Reconciler, order: &RemoteOrder) -> ServiceResult<bool> {
    if order.discount_codes.is_empty() {
        return Ok(false);
    }
    let now = now_millis();
    for discount in &order.discount_codes {
        let outcome = tradein::redeem_code(ctx.store(), &discount.code, now).await?;
        if outcome.redeemed {
            tracing::info!(order_id = order.id, code = %discount.code, "Trade-in credit redeemed by order");
        }
    }
    Ok(true)
}

//! Subscription record access

use serde_json::{Value, json};
use shared::models::Subscription;

use super::{Collection, Filter, RecordStore, create_as, get_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn list(store: &dyn RecordStore) -> ProviderResult<Vec<Subscription>> {
    list_as(store, Collection::Subscriptions, &Filter::all()).await
}

pub async fn list_for_customer(
    store: &dyn RecordStore,
    customer_id: &str,
) -> ProviderResult<Vec<Subscription>> {
    list_as(
        store,
        Collection::Subscriptions,
        &Filter::eq("customer_id", customer_id),
    )
    .await
}

pub async fn get(store: &dyn RecordStore, id: &str) -> ProviderResult<Option<Subscription>> {
    get_as(store, Collection::Subscriptions, id).await
}

pub async fn find_by_payments_id(
    store: &dyn RecordStore,
    payments_subscription_id: &str,
) -> ProviderResult<Option<Subscription>> {
    let found: Vec<Subscription> = list_as(
        store,
        Collection::Subscriptions,
        &Filter::eq("payments_subscription_id", payments_subscription_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

/// Insert a subscription; `body` is the full document minus `id`/`created_at`
pub async fn create(store: &dyn RecordStore, body: &Value) -> ProviderResult<Subscription> {
    create_as(store, Collection::Subscriptions, body).await
}

pub async fn update(store: &dyn RecordStore, id: &str, patch: Value) -> ProviderResult<Subscription> {
    update_as(store, Collection::Subscriptions, id, patch).await
}

/// Move every subscription of `from` onto `to`; returns how many moved
pub async fn reassign_customer(
    store: &dyn RecordStore,
    from: &str,
    to: &str,
) -> ProviderResult<usize> {
    let owned = list_for_customer(store, from).await?;
    for sub in &owned {
        store
            .update(Collection::Subscriptions, &sub.id, json!({ "customer_id": to }))
            .await?;
    }
    Ok(owned.len())
}

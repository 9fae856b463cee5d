//! Coupon record access

use serde_json::{Value, json};
use shared::models::Coupon;

use super::{Collection, Filter, RecordStore, create_as, get_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn get(store: &dyn RecordStore, id: &str) -> ProviderResult<Option<Coupon>> {
    get_as(store, Collection::Coupons, id).await
}

pub async fn find_by_code(store: &dyn RecordStore, code: &str) -> ProviderResult<Option<Coupon>> {
    let found: Vec<Coupon> = list_as(store, Collection::Coupons, &Filter::eq("code", code)).await?;
    Ok(found.into_iter().next())
}

pub async fn create(store: &dyn RecordStore, body: &Value) -> ProviderResult<Coupon> {
    create_as(store, Collection::Coupons, body).await
}

pub async fn update(store: &dyn RecordStore, id: &str, patch: Value) -> ProviderResult<Coupon> {
    update_as(store, Collection::Coupons, id, patch).await
}

/// Coupons whose remote creation left a price rule behind
pub async fn list_orphaned(store: &dyn RecordStore) -> ProviderResult<Vec<Coupon>> {
    let all: Vec<Coupon> = list_as(store, Collection::Coupons, &Filter::all()).await?;
    Ok(all
        .into_iter()
        .filter(|c| c.orphaned_price_rule_id.is_some())
        .collect())
}

/// Move every coupon of `from` onto `to`; returns how many moved
pub async fn reassign_customer(
    store: &dyn RecordStore,
    from: &str,
    to: &str,
) -> ProviderResult<usize> {
    let owned: Vec<Coupon> =
        list_as(store, Collection::Coupons, &Filter::eq("customer_id", from)).await?;
    for coupon in &owned {
        store
            .update(Collection::Coupons, &coupon.id, json!({ "customer_id": to }))
            .await?;
    }
    Ok(owned.len())
}

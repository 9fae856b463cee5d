//! Trade-in evaluation record access

use serde_json::{Value, json};
use shared::models::Evaluation;

use super::{Collection, Filter, RecordStore, create_as, get_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn get(store: &dyn RecordStore, id: &str) -> ProviderResult<Option<Evaluation>> {
    get_as(store, Collection::Evaluations, id).await
}

pub async fn create(store: &dyn RecordStore, body: &Value) -> ProviderResult<Evaluation> {
    create_as(store, Collection::Evaluations, body).await
}

pub async fn update(store: &dyn RecordStore, id: &str, patch: Value) -> ProviderResult<Evaluation> {
    update_as(store, Collection::Evaluations, id, patch).await
}

pub async fn find_by_coupon_code(
    store: &dyn RecordStore,
    code: &str,
) -> ProviderResult<Option<Evaluation>> {
    let found: Vec<Evaluation> =
        list_as(store, Collection::Evaluations, &Filter::eq("coupon_code", code)).await?;
    Ok(found.into_iter().next())
}

/// Move every evaluation of `from` onto `to`; returns how many moved
pub async fn reassign_customer(
    store: &dyn RecordStore,
    from: &str,
    to: &str,
) -> ProviderResult<usize> {
    let owned: Vec<Evaluation> =
        list_as(store, Collection::Evaluations, &Filter::eq("customer_id", from)).await?;
    for eval in &owned {
        store
            .update(Collection::Evaluations, &eval.id, json!({ "customer_id": to }))
            .await?;
    }
    Ok(owned.len())
}

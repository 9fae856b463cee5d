//! Customer record access

use serde_json::{Map, Value, json};
use shared::models::{Customer, CustomerCreate, EntityType, normalize_email};

use super::{Collection, Filter, RecordStore, create_as, get_as, list_as, mappings, update_as};
use crate::error::ProviderResult;

pub async fn list(store: &dyn RecordStore) -> ProviderResult<Vec<Customer>> {
    list_as(store, Collection::Customers, &Filter::all()).await
}

pub async fn get(store: &dyn RecordStore, id: &str) -> ProviderResult<Option<Customer>> {
    get_as(store, Collection::Customers, id).await
}

/// All customers whose normalized email matches
pub async fn find_by_email(store: &dyn RecordStore, email: &str) -> ProviderResult<Vec<Customer>> {
    let key = normalize_email(email);
    Ok(list(store)
        .await?
        .into_iter()
        .filter(|c| c.email_key() == key)
        .collect())
}

pub async fn find_by_payments_id(
    store: &dyn RecordStore,
    payments_customer_id: &str,
) -> ProviderResult<Option<Customer>> {
    let found: Vec<Customer> = list_as(
        store,
        Collection::Customers,
        &Filter::eq("payments_customer_id", payments_customer_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

pub async fn find_by_commerce_id(
    store: &dyn RecordStore,
    commerce_customer_id: &str,
) -> ProviderResult<Option<Customer>> {
    let found: Vec<Customer> = list_as(
        store,
        Collection::Customers,
        &Filter::eq("commerce_customer_id", commerce_customer_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

/// Customer linked to a payments customer id: the id on the record first,
/// then the customer mapping (the record may predate the link).
pub async fn find_linked_to_payments(
    store: &dyn RecordStore,
    payments_customer_id: &str,
) -> ProviderResult<Option<Customer>> {
    if let Some(found) = find_by_payments_id(store, payments_customer_id).await? {
        return Ok(Some(found));
    }
    match mappings::find_by_payments_id(store, EntityType::Customer, payments_customer_id).await? {
        Some(mapping) => get(store, &mapping.local_id).await,
        None => Ok(None),
    }
}

/// Storefront counterpart of [`find_linked_to_payments`]
pub async fn find_linked_to_commerce(
    store: &dyn RecordStore,
    commerce_customer_id: &str,
) -> ProviderResult<Option<Customer>> {
    if let Some(found) = find_by_commerce_id(store, commerce_customer_id).await? {
        return Ok(Some(found));
    }
    match mappings::find_by_commerce_id(store, EntityType::Customer, commerce_customer_id).await? {
        Some(mapping) => get(store, &mapping.local_id).await,
        None => Ok(None),
    }
}

pub async fn create(store: &dyn RecordStore, customer: &CustomerCreate) -> ProviderResult<Customer> {
    create_as(store, Collection::Customers, customer).await
}

/// Set external ids; `None` leaves the stored value untouched
pub async fn set_external_ids(
    store: &dyn RecordStore,
    id: &str,
    payments_customer_id: Option<&str>,
    commerce_customer_id: Option<&str>,
) -> ProviderResult<Customer> {
    let mut patch = Map::new();
    if let Some(pid) = payments_customer_id {
        patch.insert("payments_customer_id".into(), json!(pid));
    }
    if let Some(cid) = commerce_customer_id {
        patch.insert("commerce_customer_id".into(), json!(cid));
    }
    update_as(store, Collection::Customers, id, Value::Object(patch)).await
}

pub async fn delete(store: &dyn RecordStore, id: &str) -> ProviderResult<()> {
    store.delete(Collection::Customers, id).await
}

/// Find the customer for `incoming.email` or create one.
///
/// An existing customer gains any external id or name it is missing; ids it
/// already carries are never overwritten. With several matches (unmerged
/// duplicates) the most recently created one is used.
pub async fn upsert_by_email(
    store: &dyn RecordStore,
    incoming: &CustomerCreate,
) -> ProviderResult<(Customer, bool)> {
    let mut matches = find_by_email(store, &incoming.email).await?;
    matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let Some(existing) = matches.into_iter().next() else {
        let created = create(store, incoming).await?;
        return Ok((created, true));
    };

    let mut patch = Map::new();
    if existing.payments_customer_id.is_none() {
        if let Some(pid) = &incoming.payments_customer_id {
            patch.insert("payments_customer_id".into(), json!(pid));
        }
    }
    if existing.commerce_customer_id.is_none() {
        if let Some(cid) = &incoming.commerce_customer_id {
            patch.insert("commerce_customer_id".into(), json!(cid));
        }
    }
    if existing.first_name.is_empty() && !incoming.first_name.is_empty() {
        patch.insert("first_name".into(), json!(incoming.first_name));
    }
    if existing.last_name.is_empty() && !incoming.last_name.is_empty() {
        patch.insert("last_name".into(), json!(incoming.last_name));
    }

    if patch.is_empty() {
        return Ok((existing, false));
    }
    let updated = update_as(store, Collection::Customers, &existing.id, Value::Object(patch)).await?;
    Ok((updated, false))
}

//! Entity mapping store
//!
//! Persisted `(entity_type, local_id) -> (payments_id, commerce_id, last_synced)`
//! table. At most one row exists per `(entity_type, local_id)`: writes always
//! go through [`upsert`], which updates the existing row when there is one.
//! Rows are never deleted here.

use serde_json::{Map, Value, json};
use shared::models::{EntityMapping, EntityType};

use super::{Collection, Filter, RecordStore, create_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn list(store: &dyn RecordStore) -> ProviderResult<Vec<EntityMapping>> {
    list_as(store, Collection::EntityMappings, &Filter::all()).await
}

pub async fn get(
    store: &dyn RecordStore,
    entity_type: EntityType,
    local_id: &str,
) -> ProviderResult<Option<EntityMapping>> {
    let found: Vec<EntityMapping> = list_as(
        store,
        Collection::EntityMappings,
        &Filter::eq("entity_type", entity_type.as_str()).and("local_id", local_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

pub async fn find_by_payments_id(
    store: &dyn RecordStore,
    entity_type: EntityType,
    payments_id: &str,
) -> ProviderResult<Option<EntityMapping>> {
    let found: Vec<EntityMapping> = list_as(
        store,
        Collection::EntityMappings,
        &Filter::eq("entity_type", entity_type.as_str()).and("payments_id", payments_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

pub async fn find_by_commerce_id(
    store: &dyn RecordStore,
    entity_type: EntityType,
    commerce_id: &str,
) -> ProviderResult<Option<EntityMapping>> {
    let found: Vec<EntityMapping> = list_as(
        store,
        Collection::EntityMappings,
        &Filter::eq("entity_type", entity_type.as_str()).and("commerce_id", commerce_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

/// Update-or-insert the mapping for `(entity_type, local_id)` and refresh
/// `last_synced`. A `None` id keeps whatever the existing row holds.
pub async fn upsert(
    store: &dyn RecordStore,
    entity_type: EntityType,
    local_id: &str,
    payments_id: Option<&str>,
    commerce_id: Option<&str>,
    now: i64,
) -> ProviderResult<EntityMapping> {
    if let Some(existing) = get(store, entity_type, local_id).await? {
        let mut patch = Map::new();
        patch.insert("last_synced".into(), json!(now));
        if let Some(pid) = payments_id {
            patch.insert("payments_id".into(), json!(pid));
        }
        if let Some(cid) = commerce_id {
            patch.insert("commerce_id".into(), json!(cid));
        }
        return update_as(store, Collection::EntityMappings, &existing.id, Value::Object(patch))
            .await;
    }

    create_as(
        store,
        Collection::EntityMappings,
        &json!({
            "entity_type": entity_type,
            "local_id": local_id,
            "payments_id": payments_id,
            "commerce_id": commerce_id,
            "last_synced": now,
        }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_pair() {
        let store = MemoryRecordStore::new();
        upsert(&store, EntityType::Customer, "c1", Some("cus_1"), None, 10)
            .await
            .unwrap();
        upsert(&store, EntityType::Customer, "c1", None, Some("55"), 20)
            .await
            .unwrap();
        upsert(&store, EntityType::Product, "c1", None, Some("9"), 20)
            .await
            .unwrap();

        let rows = list(&store).await.unwrap();
        assert_eq!(rows.len(), 2);

        let m = get(&store, EntityType::Customer, "c1").await.unwrap().unwrap();
        assert_eq!(m.payments_id.as_deref(), Some("cus_1"));
        assert_eq!(m.commerce_id.as_deref(), Some("55"));
        assert_eq!(m.last_synced, 20);
    }

    #[tokio::test]
    async fn test_lookup_by_external_id_is_scoped_by_type() {
        let store = MemoryRecordStore::new();
        upsert(&store, EntityType::Subscription, "s1", Some("sub_1"), None, 1)
            .await
            .unwrap();
        assert!(
            find_by_payments_id(&store, EntityType::Subscription, "sub_1")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            find_by_payments_id(&store, EntityType::Customer, "sub_1")
                .await
                .unwrap()
                .is_none()
        );
    }
}

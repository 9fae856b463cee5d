//! Product record access

use serde_json::json;
use shared::models::Product;

use super::{Collection, Filter, RecordStore, create_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn list(store: &dyn RecordStore) -> ProviderResult<Vec<Product>> {
    list_as(store, Collection::Products, &Filter::all()).await
}

pub async fn find_by_commerce_id(
    store: &dyn RecordStore,
    commerce_product_id: &str,
) -> ProviderResult<Option<Product>> {
    let found: Vec<Product> = list_as(
        store,
        Collection::Products,
        &Filter::eq("commerce_product_id", commerce_product_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

/// Create or refresh the local copy of a storefront product
pub async fn upsert_from_commerce(
    store: &dyn RecordStore,
    commerce_product_id: &str,
    title: &str,
    price: Option<f64>,
    status: Option<&str>,
) -> ProviderResult<Product> {
    let fields = json!({
        "title": title,
        "commerce_product_id": commerce_product_id,
        "price": price,
        "status": status,
    });
    match find_by_commerce_id(store, commerce_product_id).await? {
        Some(existing) => update_as(store, Collection::Products, &existing.id, fields).await,
        None => create_as(store, Collection::Products, &fields).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    #[tokio::test]
    async fn test_upsert_refreshes_existing() {
        let store = MemoryRecordStore::new();
        let first = upsert_from_commerce(&store, "42", "Cloud", Some(999.0), Some("active"))
            .await
            .unwrap();
        let second = upsert_from_commerce(&store, "42", "Cloud Plus", None, Some("draft"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Cloud Plus");
        assert_eq!(list(&store).await.unwrap().len(), 1);
    }
}

//! In-process record store
//!
//! Same semantics as the HTTP store; used for local development
//! (`RECORD_STORE_URL=memory:`) and tests. Documents keep insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, Filter, RecordStore, prepare_create};
use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn id_of(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, collection: Collection, filter: &Filter) -> ProviderResult<Vec<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> ProviderResult<Option<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)).cloned()))
    }

    async fn create(&self, collection: Collection, data: Value) -> ProviderResult<Value> {
        let doc = prepare_create(data)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        if docs.iter().any(|d| id_of(d) == id_of(&doc)) {
            return Err(ProviderError::Api {
                status: 409,
                body: format!(
                    "{}/{} already exists",
                    collection.as_str(),
                    id_of(&doc).unwrap_or_default()
                ),
            });
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> ProviderResult<Value> {
        let Value::Object(fields) = patch else {
            return Err(ProviderError::InvalidResponse(
                "patch must be a JSON object".into(),
            ));
        };
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
            .ok_or_else(|| ProviderError::NotFound(format!("{}/{id}", collection.as_str())))?;

        if let Some(obj) = doc.as_object_mut() {
            for (key, value) in fields {
                // id is immutable
                if key != "id" {
                    obj.insert(key, value);
                }
            }
        }
        Ok(doc.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> ProviderResult<()> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        let before = docs.len();
        docs.retain(|d| id_of(d) != Some(id));
        if docs.len() == before {
            return Err(ProviderError::NotFound(format!("{}/{id}", collection.as_str())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_generates_id_when_missing() {
        let store = MemoryRecordStore::new();
        let doc = store
            .create(Collection::Customers, json!({"email": "a@x.com"}))
            .await
            .unwrap();
        let id = doc["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert!(store.get(Collection::Customers, id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = MemoryRecordStore::new();
        store
            .create(Collection::Customers, json!({"id": "c1"}))
            .await
            .unwrap();
        let err = store
            .create(Collection::Customers, json!({"id": "c1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryRecordStore::new();
        store
            .create(
                Collection::Customers,
                json!({"id": "c1", "email": "a@x.com", "first_name": "Ann"}),
            )
            .await
            .unwrap();
        let updated = store
            .update(
                Collection::Customers,
                "c1",
                json!({"first_name": "Anne", "id": "other"}),
            )
            .await
            .unwrap();
        assert_eq!(updated["first_name"], "Anne");
        assert_eq!(updated["email"], "a@x.com");
        assert_eq!(updated["id"], "c1");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store
            .update(Collection::Coupons, "nope", json!({"active": false}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
        let err = store.delete(Collection::Coupons, "nope").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_applies_filter() {
        let store = MemoryRecordStore::new();
        for (id, email) in [("c1", "a@x.com"), ("c2", "b@x.com"), ("c3", "a@x.com")] {
            store
                .create(Collection::Customers, json!({"id": id, "email": email}))
                .await
                .unwrap();
        }
        let found = store
            .list(Collection::Customers, &Filter::eq("email", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(store.count(Collection::Customers).await, 3);
    }
}

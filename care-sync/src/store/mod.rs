//! Record store access layer
//!
//! The record store is the canonical, locally-owned document store. Every
//! collection holds plain JSON documents with a string `id`. [`RecordStore`]
//! is the generic CRUD seam; the per-collection modules are thin typed
//! helpers over it.

pub mod coupons;
pub mod customers;
pub mod evaluations;
pub mod http;
pub mod mappings;
pub mod memory;
pub mod products;
pub mod subscriptions;
pub mod sync_history;
pub mod webhook_logs;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};

pub use self::http::HttpRecordStore;
pub use memory::MemoryRecordStore;

/// Record store collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Customers,
    Subscriptions,
    Evaluations,
    Coupons,
    Products,
    EntityMappings,
    SyncHistory,
    PaymentsWebhookLogs,
    CommerceWebhookLogs,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Subscriptions => "subscriptions",
            Self::Evaluations => "evaluations",
            Self::Coupons => "coupons",
            Self::Products => "products",
            Self::EntityMappings => "entity_mappings",
            Self::SyncHistory => "sync_history",
            Self::PaymentsWebhookLogs => "payments_webhook_logs",
            Self::CommerceWebhookLogs => "commerce_webhook_logs",
        }
    }
}

/// Conjunction of top-level field equality tests.
///
/// A `null` value matches documents where the field is absent or null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Match every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            let actual = doc.get(field).unwrap_or(&Value::Null);
            actual == expected
        })
    }
}

/// Generic CRUD against the canonical store.
///
/// Errors are passed through unwrapped; callers classify them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, collection: Collection, filter: &Filter) -> ProviderResult<Vec<Value>>;

    async fn get(&self, collection: Collection, id: &str) -> ProviderResult<Option<Value>>;

    /// Insert a document. A missing `id` is generated locally.
    async fn create(&self, collection: Collection, data: Value) -> ProviderResult<Value>;

    /// Shallow merge `patch` into the stored document and return the result
    async fn update(&self, collection: Collection, id: &str, patch: Value) -> ProviderResult<Value>;

    async fn delete(&self, collection: Collection, id: &str) -> ProviderResult<()>;
}

/// Assign `id` and `created_at` to a document about to be created
pub(crate) fn prepare_create(mut data: Value) -> ProviderResult<Value> {
    let obj = data
        .as_object_mut()
        .ok_or_else(|| ProviderError::InvalidResponse("record must be a JSON object".into()))?;

    let has_id = obj
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_id {
        obj.insert("id".into(), Value::String(shared::util::record_id()));
    }
    let has_created = obj.get("created_at").and_then(Value::as_i64).is_some_and(|t| t > 0);
    if !has_created {
        obj.insert("created_at".into(), shared::util::now_millis().into());
    }
    Ok(data)
}

// ========== Typed helpers ==========

pub async fn list_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &Filter,
) -> ProviderResult<Vec<T>> {
    store
        .list(collection, filter)
        .await?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(ProviderError::from))
        .collect()
}

pub async fn get_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    id: &str,
) -> ProviderResult<Option<T>> {
    match store.get(collection, id).await? {
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
        None => Ok(None),
    }
}

pub async fn create_as<T: DeserializeOwned, B: Serialize + ?Sized>(
    store: &dyn RecordStore,
    collection: Collection,
    body: &B,
) -> ProviderResult<T> {
    let data = serde_json::to_value(body)?;
    let created = store.create(collection, data).await?;
    Ok(serde_json::from_value(created)?)
}

pub async fn update_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    id: &str,
    patch: Value,
) -> ProviderResult<T> {
    let updated = store.update(collection, id, patch).await?;
    Ok(serde_json::from_value(updated)?)
}

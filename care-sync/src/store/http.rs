//! HTTP record store client
//!
//! Talks to a headless-CMS item API:
//! `GET/POST /items/{collection}`, `GET/PATCH/DELETE /items/{collection}/{id}`.
//! Payloads are wrapped in `{"data": ...}`; equality filters are sent as
//! `filter[field][_eq]=value` (`_null` for null).
//!
//! Item routes answer 403 rather than 404 for an id that does not exist, so
//! both mean "absent" there. Collection routes keep 403 as an error, which
//! is where a bad token shows up.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{Collection, Filter, RecordStore, prepare_create};
use crate::error::{ProviderError, ProviderResult};

fn item_missing(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/items/{}", self.base_url, collection.as_str())
    }

    fn item_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    /// Query pairs for a filter
    fn filter_query(filter: &Filter) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = filter
            .conditions()
            .iter()
            .map(|(field, value)| match value {
                Value::Null => (format!("filter[{field}][_null]"), "true".to_string()),
                Value::String(s) => (format!("filter[{field}][_eq]"), s.clone()),
                other => (format!("filter[{field}][_eq]"), other.to_string()),
            })
            .collect();
        query.push(("limit".into(), "-1".into()));
        query
    }

    async fn read_data(response: reqwest::Response) -> ProviderResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: Envelope<Value> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self, collection: Collection, filter: &Filter) -> ProviderResult<Vec<Value>> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .bearer_auth(&self.token)
            .query(&Self::filter_query(filter))
            .send()
            .await?;
        match Self::read_data(response).await? {
            Value::Array(items) => Ok(items),
            other => Err(ProviderError::InvalidResponse(format!(
                "expected array for {}, got {other}",
                collection.as_str()
            ))),
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> ProviderResult<Option<Value>> {
        let response = self
            .client
            .get(self.item_url(collection, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if item_missing(response.status()) {
            return Ok(None);
        }
        Self::read_data(response).await.map(Some)
    }

    async fn create(&self, collection: Collection, data: Value) -> ProviderResult<Value> {
        let doc = prepare_create(data)?;
        let response = self
            .client
            .post(self.collection_url(collection))
            .bearer_auth(&self.token)
            .json(&doc)
            .send()
            .await?;
        Self::read_data(response).await
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> ProviderResult<Value> {
        let response = self
            .client
            .patch(self.item_url(collection, id))
            .bearer_auth(&self.token)
            .json(&patch)
            .send()
            .await?;
        if item_missing(response.status()) {
            return Err(ProviderError::NotFound(format!("{}/{id}", collection.as_str())));
        }
        Self::read_data(response).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> ProviderResult<()> {
        let response = self
            .client
            .delete(self.item_url(collection, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = response.status();
        if item_missing(status) {
            return Err(ProviderError::NotFound(format!("{}/{id}", collection.as_str())));
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

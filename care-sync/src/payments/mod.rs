//! Payments provider integration via REST API (no SDK dependency)
//!
//! Stripe-style form API authenticated with the mode-selected secret key.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::error::{ProviderError, ProviderResult};

/// Signature header on inbound webhooks
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Replay window for webhook timestamps, in seconds
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Subscription as the payments provider reports it
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteSubscription {
    pub id: String,
    pub customer: String,
    /// Provider status (`active`, `trialing`, `past_due`, `paused`, `canceled`, ...)
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
}

/// Remote subscription state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Pause,
    Resume,
    Cancel,
}

#[async_trait]
pub trait PaymentsApi: Send + Sync {
    async fn list_subscriptions(&self, customer_id: &str) -> ProviderResult<Vec<RemoteSubscription>>;

    async fn get_subscription(&self, subscription_id: &str) -> ProviderResult<RemoteSubscription>;

    async fn update_subscription_status(
        &self,
        subscription_id: &str,
        action: SubscriptionAction,
    ) -> ProviderResult<RemoteSubscription>;

    /// Create a payment link for one unit of `price_id`
    async fn create_payment_link(
        &self,
        price_id: &str,
        metadata: &[(&str, &str)],
    ) -> ProviderResult<PaymentLink>;

    async fn update_payment_link(&self, link_id: &str, active: bool) -> ProviderResult<PaymentLink>;
}

#[derive(Debug, Clone)]
pub struct HttpPaymentsClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl HttpPaymentsClient {
    pub fn new(api_base: &str, secret_key: &str) -> Self {
        Self::with_client(Client::new(), api_base, secret_key)
    }

    pub fn with_client(client: Client, api_base: &str, secret_key: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = request
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(response.text().await?));
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentsApi for HttpPaymentsClient {
    async fn list_subscriptions(&self, customer_id: &str) -> ProviderResult<Vec<RemoteSubscription>> {
        let page: ListPage<RemoteSubscription> = self
            .send(self.client.get(self.url("subscriptions")).query(&[
                ("customer", customer_id),
                ("status", "all"),
                ("limit", "100"),
            ]))
            .await?;
        Ok(page.data)
    }

    async fn get_subscription(&self, subscription_id: &str) -> ProviderResult<RemoteSubscription> {
        self.send(
            self.client
                .get(self.url(&format!("subscriptions/{subscription_id}"))),
        )
        .await
    }

    async fn update_subscription_status(
        &self,
        subscription_id: &str,
        action: SubscriptionAction,
    ) -> ProviderResult<RemoteSubscription> {
        let url = self.url(&format!("subscriptions/{subscription_id}"));
        let request = match action {
            SubscriptionAction::Pause => self
                .client
                .post(url)
                .form(&[("pause_collection[behavior]", "void")]),
            // Empty value clears pause_collection
            SubscriptionAction::Resume => self.client.post(url).form(&[("pause_collection", "")]),
            SubscriptionAction::Cancel => self.client.delete(url),
        };
        self.send(request).await
    }

    async fn create_payment_link(
        &self,
        price_id: &str,
        metadata: &[(&str, &str)],
    ) -> ProviderResult<PaymentLink> {
        let mut form: Vec<(String, String)> = vec![
            ("line_items[0][price]".into(), price_id.into()),
            ("line_items[0][quantity]".into(), "1".into()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), (*value).to_string()));
        }
        self.send(self.client.post(self.url("payment_links")).form(&form))
            .await
    }

    async fn update_payment_link(&self, link_id: &str, active: bool) -> ProviderResult<PaymentLink> {
        self.send(
            self.client
                .post(self.url(&format!("payment_links/{link_id}")))
                .form(&[("active", if active { "true" } else { "false" })]),
        )
        .await
    }
}

/// Verify a webhook signature header (`t=...,v1=...`, HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp outside tolerance");
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Any v1 entry may match (secret rotation sends several)
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err("Webhook signature mismatch")
    }
}

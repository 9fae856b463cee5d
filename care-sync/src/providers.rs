//! Provider credentials and client construction
//!
//! Credentials live in [`ProviderSettings`] behind a lock in `AppState` and can
//! be replaced at runtime. Clients are built from the current settings at the
//! start of every operation, so a settings update takes effect for the next
//! operation without a restart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::commerce::{CommerceApi, HttpCommerceClient};
use crate::payments::{HttpPaymentsClient, PaymentsApi};

/// Payments key selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentsMode {
    #[default]
    Test,
    Live,
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentsSettings {
    #[serde(default)]
    pub mode: PaymentsMode,
    #[serde(default)]
    pub test_secret_key: String,
    #[serde(default)]
    pub live_secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_payments_api_base")]
    pub api_base: String,
}

fn default_payments_api_base() -> String {
    "https://api.stripe.com".into()
}

impl PaymentsSettings {
    /// Secret key for the selected mode
    pub fn secret_key(&self) -> &str {
        match self.mode {
            PaymentsMode::Test => &self.test_secret_key,
            PaymentsMode::Live => &self.live_secret_key,
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for PaymentsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsSettings")
            .field("mode", &self.mode)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CommerceSettings {
    pub shop_domain: String,
    pub access_token: String,
    #[serde(default = "default_commerce_api_version")]
    pub api_version: String,
    pub webhook_secret: String,
}

fn default_commerce_api_version() -> String {
    "2024-01".into()
}

impl std::fmt::Debug for CommerceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceSettings")
            .field("shop_domain", &self.shop_domain)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    pub payments: PaymentsSettings,
    pub commerce: CommerceSettings,
}

impl ProviderSettings {
    /// Reject settings no client could work with
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.payments.secret_key().is_empty() {
            return Err("Secret key for the selected payments mode is empty");
        }
        if self.payments.webhook_secret.is_empty() || self.commerce.webhook_secret.is_empty() {
            return Err("Webhook secrets must not be empty");
        }
        if self.commerce.shop_domain.trim().is_empty() || self.commerce.access_token.is_empty() {
            return Err("Storefront domain and access token are required");
        }
        Ok(())
    }
}

/// Builds provider clients from settings
pub trait ClientFactory: Send + Sync {
    fn payments(&self, settings: &PaymentsSettings) -> Arc<dyn PaymentsApi>;
    fn commerce(&self, settings: &CommerceSettings) -> Arc<dyn CommerceApi>;
}

/// Production factory: real HTTP clients
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for HttpClientFactory {
    fn payments(&self, settings: &PaymentsSettings) -> Arc<dyn PaymentsApi> {
        Arc::new(HttpPaymentsClient::with_client(
            self.http.clone(),
            &settings.api_base,
            settings.secret_key(),
        ))
    }

    fn commerce(&self, settings: &CommerceSettings) -> Arc<dyn CommerceApi> {
        Arc::new(HttpCommerceClient::with_client(
            self.http.clone(),
            &settings.shop_domain,
            &settings.api_version,
            &settings.access_token,
        ))
    }
}

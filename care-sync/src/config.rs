//! Service configuration

use crate::error::BoxError;
use crate::providers::{CommerceSettings, PaymentsMode, PaymentsSettings, ProviderSettings};

/// care-sync configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port (webhooks + admin API)
    pub http_port: u16,
    /// Record store base URL; `memory:` selects the in-process store
    pub record_store_url: String,
    /// Record store bearer token
    pub record_store_token: String,
    /// Initial provider credentials (replaceable at runtime)
    pub providers: ProviderSettings,
    /// Auto sync interval in minutes (0 disables)
    pub sync_interval_minutes: u64,
    /// Optional JSON plan catalog
    pub plan_catalog_path: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let mode = match std::env::var("PAYMENTS_MODE").as_deref() {
            Ok("live") => PaymentsMode::Live,
            _ => PaymentsMode::Test,
        };
        // Only the key for the selected mode is mandatory
        let (test_secret_key, live_secret_key) = match mode {
            PaymentsMode::Test => (
                Self::require_secret("PAYMENTS_TEST_SECRET_KEY", &environment)?,
                std::env::var("PAYMENTS_LIVE_SECRET_KEY").unwrap_or_default(),
            ),
            PaymentsMode::Live => (
                std::env::var("PAYMENTS_TEST_SECRET_KEY").unwrap_or_default(),
                Self::require_secret("PAYMENTS_LIVE_SECRET_KEY", &environment)?,
            ),
        };

        let providers = ProviderSettings {
            payments: PaymentsSettings {
                mode,
                test_secret_key,
                live_secret_key,
                webhook_secret: Self::require_secret("PAYMENTS_WEBHOOK_SECRET", &environment)?,
                api_base: std::env::var("PAYMENTS_API_BASE")
                    .unwrap_or_else(|_| "https://api.stripe.com".into()),
            },
            commerce: CommerceSettings {
                shop_domain: std::env::var("COMMERCE_SHOP_DOMAIN")
                    .unwrap_or_else(|_| "example.myshopify.com".into()),
                access_token: Self::require_secret("COMMERCE_ACCESS_TOKEN", &environment)?,
                api_version: std::env::var("COMMERCE_API_VERSION")
                    .unwrap_or_else(|_| "2024-01".into()),
                webhook_secret: Self::require_secret("COMMERCE_WEBHOOK_SECRET", &environment)?,
            },
        };

        Ok(Self {
            environment: environment.clone(),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            record_store_url: std::env::var("RECORD_STORE_URL")
                .unwrap_or_else(|_| "memory:".into()),
            record_store_token: Self::require_secret("RECORD_STORE_TOKEN", &environment)?,
            providers,
            sync_interval_minutes: std::env::var("SYNC_INTERVAL_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            plan_catalog_path: std::env::var("PLAN_CATALOG_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    /// True when the in-process record store should be used
    pub fn uses_memory_store(&self) -> bool {
        self.record_store_url.starts_with("memory:")
    }
}

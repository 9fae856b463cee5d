//! Application state for care-sync

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::BoxError;
use crate::plans::PlanCatalog;
use crate::providers::{ClientFactory, HttpClientFactory, ProviderSettings};
use crate::reconcile::{
    AutoSync, CustomerSyncReport, FullSyncReport, Reconciler, ResolveReport, SingleFlight,
};
use crate::store::{HttpRecordStore, MemoryRecordStore, RecordStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Canonical record store
    pub store: Arc<dyn RecordStore>,
    /// Current provider credentials; replaced by the settings endpoint
    pub settings: Arc<RwLock<ProviderSettings>>,
    /// Builds provider clients from a settings snapshot
    pub clients: Arc<dyn ClientFactory>,
    pub plans: Arc<PlanCatalog>,
    /// One run at a time per kind
    pub full_sync: SingleFlight,
    pub customer_sync: SingleFlight,
    pub resolve: SingleFlight,
    auto_sync: Arc<Mutex<Option<AutoSync>>>,
}

fn already_running(kind: &str) -> AppError {
    AppError::with_message(
        ErrorCode::SyncAlreadyRunning,
        format!("A {kind} is already running"),
    )
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn RecordStore> = if config.uses_memory_store() {
            tracing::warn!("Using in-process record store; data is not persisted");
            Arc::new(MemoryRecordStore::new())
        } else {
            Arc::new(HttpRecordStore::new(
                &config.record_store_url,
                &config.record_store_token,
            ))
        };

        let plans = match &config.plan_catalog_path {
            Some(path) => PlanCatalog::from_json_file(path)?,
            None => PlanCatalog::builtin(),
        };
        tracing::info!(plan_version = plans.version, "Plan catalog loaded");

        Ok(Self::from_parts(
            store,
            config.providers.clone(),
            Arc::new(HttpClientFactory::new()),
            plans,
        ))
    }

    pub fn from_parts(
        store: Arc<dyn RecordStore>,
        settings: ProviderSettings,
        clients: Arc<dyn ClientFactory>,
        plans: PlanCatalog,
    ) -> Self {
        Self {
            store,
            settings: Arc::new(RwLock::new(settings)),
            clients,
            plans: Arc::new(plans),
            full_sync: SingleFlight::new(),
            customer_sync: SingleFlight::new(),
            resolve: SingleFlight::new(),
            auto_sync: Arc::new(Mutex::new(None)),
        }
    }

    /// Reconciler with clients built from the current settings
    pub async fn reconciler(&self) -> Reconciler {
        let settings = self.settings.read().await.clone();
        Reconciler::new(
            self.store.clone(),
            self.clients.payments(&settings.payments),
            self.clients.commerce(&settings.commerce),
            self.plans.clone(),
        )
    }

    pub async fn settings_snapshot(&self) -> ProviderSettings {
        self.settings.read().await.clone()
    }

    /// Replace provider credentials; the next operation uses them
    pub async fn update_settings(&self, settings: ProviderSettings) {
        *self.settings.write().await = settings;
        tracing::info!("Provider settings updated");
    }

    pub async fn run_full_sync(&self) -> Result<FullSyncReport, AppError> {
        let Some(_guard) = self.full_sync.try_begin() else {
            return Err(already_running("full sync"));
        };
        Ok(self.reconciler().await.run_full_sync().await?)
    }

    pub async fn run_customer_sync(&self) -> Result<CustomerSyncReport, AppError> {
        let Some(_guard) = self.customer_sync.try_begin() else {
            return Err(already_running("customer sync"));
        };
        Ok(self.reconciler().await.run_customer_sync().await?)
    }

    pub async fn resolve_conflicts(&self) -> Result<ResolveReport, AppError> {
        let Some(_guard) = self.resolve.try_begin() else {
            return Err(already_running("conflict resolution"));
        };
        Ok(self.reconciler().await.resolve_conflicts().await?)
    }

    /// Replace the auto sync loop; `0` turns it off
    pub async fn schedule_auto_sync(&self, interval_minutes: u64) {
        let mut slot = self.auto_sync.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        if interval_minutes == 0 {
            tracing::info!("Auto sync disabled");
            return;
        }
        *slot = Some(AutoSync::start(self.clone(), interval_minutes));
    }

    /// Current auto sync interval, if a loop is running
    pub async fn auto_sync_interval(&self) -> Option<u64> {
        self.auto_sync
            .lock()
            .await
            .as_ref()
            .filter(|a| !a.is_finished())
            .map(AutoSync::interval_minutes)
    }
}

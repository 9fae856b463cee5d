//! Auto sync scheduler
//!
//! Runs a full sync immediately, then again `interval` after each run
//! finishes (fixed delay). Dropping or stopping the handle cancels the loop;
//! a run in progress is allowed to finish.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;
use shared::error::ErrorCode;

pub struct AutoSync {
    interval_minutes: u64,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoSync {
    /// Spawn the loop. `interval_minutes` must be non-zero.
    pub fn start(state: AppState, interval_minutes: u64) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let interval = Duration::from_secs(interval_minutes.max(1) * 60);

        let handle = tokio::spawn(async move {
            tracing::info!(interval_minutes, "Auto sync started");
            loop {
                Self::tick(&state).await;

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = token.cancelled() => {
                        tracing::info!("Auto sync stopped");
                        return;
                    }
                }
            }
        });

        Self {
            interval_minutes,
            shutdown,
            handle,
        }
    }

    async fn tick(state: &AppState) {
        match state.run_full_sync().await {
            Ok(report) => tracing::info!(
                customers = report.customers.synced,
                products = report.commerce.products,
                "Scheduled full sync finished"
            ),
            Err(e) if e.code == ErrorCode::SyncAlreadyRunning => {
                tracing::info!("Previous sync still running, skipping scheduled run");
            }
            Err(e) => tracing::error!(error = %e, "Scheduled full sync failed"),
        }
    }

    pub fn interval_minutes(&self) -> u64 {
        self.interval_minutes
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

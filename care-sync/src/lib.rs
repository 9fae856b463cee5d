//! care-sync: cross-provider reconciliation for the mattress-care CRM
//!
//! Keeps customers, subscriptions, trade-in evaluations and coupons
//! consistent between the record store (canonical), the payments provider
//! and the storefront:
//! - conflict detection and batch repair ([`reconcile`])
//! - idempotent webhook ingestion ([`webhook`])
//! - trade-in coupon workflow ([`tradein`])
//! - subscription lifecycle ([`subscriptions`])

pub mod api;
pub mod commerce;
pub mod config;
pub mod error;
pub mod payments;
pub mod plans;
pub mod providers;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod tradein;
pub mod webhook;

pub use config::Config;
pub use state::AppState;

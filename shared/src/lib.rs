//! Shared types for care-sync
//!
//! Domain models stored in the record store, the unified error system and
//! small id/time utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use serde::{Deserialize, Serialize};

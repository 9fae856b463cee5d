//! Data models
//!
//! Plain JSON documents as stored in the record store. All ids are strings
//! and all timestamps are Unix milliseconds.

pub mod coupon;
pub mod customer;
pub mod evaluation;
pub mod mapping;
pub mod product;
pub mod subscription;
pub mod sync;

// Re-exports
pub use coupon::*;
pub use customer::*;
pub use evaluation::*;
pub use mapping::*;
pub use product::*;
pub use subscription::*;
pub use sync::*;

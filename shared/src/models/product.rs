//! Product Model

use serde::{Deserialize, Serialize};

/// Local product record mirrored from the commerce storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub commerce_product_id: Option<String>,
    /// Payments-provider price used for payment links
    #[serde(default)]
    pub payments_price_id: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

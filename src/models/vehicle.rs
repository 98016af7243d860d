use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical vehicle row, keyed by the marketplace item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleRecord {
    pub external_id: String,
    pub slug: String,
    pub title: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub permalink: Option<String>,
    pub thumbnail: Option<String>,
    pub pictures: Vec<String>,
}

/// URL-safe identifier for a listing.
pub fn slug_for(external_id: &str) -> String {
    external_id.to_lowercase()
}

//! Marketplace item → canonical vehicle mapping.
//!
//! Listings are heterogeneous: vehicle data hides in a free-form attributes
//! list whose tags vary between categories, and any field may be missing.
//! `normalize` never fails; whatever it cannot read becomes `None`.

use serde_json::Value;

use crate::coerce;
use crate::models::item::RawItem;
use crate::models::vehicle::{slug_for, VehicleRecord};

/// Attribute tags accepted for the brand, highest priority first.
pub const BRAND_KEYS: &[&str] = &["BRAND", "VEHICLE_BRAND"];
/// Attribute tags accepted for the model, highest priority first.
pub const MODEL_KEYS: &[&str] = &["MODEL", "VEHICLE_MODEL"];
/// Attribute tags accepted for the model year, highest priority first.
pub const YEAR_KEYS: &[&str] = &["VEHICLE_YEAR", "YEAR"];

pub fn normalize(raw: &RawItem) -> VehicleRecord {
    let item = &raw.0;
    let external_id = match item.get("id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    VehicleRecord {
        slug: slug_for(&external_id),
        title: text(item, "title").unwrap_or_default(),
        brand: attribute(item, BRAND_KEYS),
        model: attribute(item, MODEL_KEYS),
        year: attribute(item, YEAR_KEYS).and_then(|y| coerce::parse_year(&y)),
        price: item.get("price").and_then(coerce::as_decimal),
        currency: text(item, "currency_id"),
        permalink: text(item, "permalink"),
        thumbnail: text(item, "thumbnail"),
        pictures: pictures(item),
        external_id,
    }
}

/// First non-empty value among `keys`, consulted in order.
pub fn attribute(item: &Value, keys: &[&str]) -> Option<String> {
    let attributes = item.get("attributes")?.as_array()?;
    keys.iter().find_map(|key| {
        attributes
            .iter()
            .filter(|a| a.get("id").and_then(Value::as_str) == Some(*key))
            .find_map(|a| match a.get("value_name") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    })
}

fn text(item: &Value, field: &str) -> Option<String> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn pictures(item: &Value) -> Vec<String> {
    item.get("pictures")
        .and_then(Value::as_array)
        .map(|pics| {
            pics.iter()
                .filter_map(|p| p.get("url").and_then(Value::as_str))
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

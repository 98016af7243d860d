use serde::{Deserialize, Serialize};

/// An item detail record exactly as the marketplace returned it.
///
/// Kept as untyped JSON: listings from different categories disagree on which
/// fields exist, so the normalizer probes the shape instead of the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(pub serde_json::Value);

impl From<serde_json::Value> for RawItem {
    fn from(value: serde_json::Value) -> Self {
        RawItem(value)
    }
}

//! Wire DTOs for the remote catalog admin API.
//!
//! These mirror the REST payload shapes (numeric IDs, string-typed prices,
//! ISO-8601 timestamps) and are converted into `models` types by the
//! reconciliation engine.

use serde::{Deserialize, Serialize};

/// One product as returned by `GET /products.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
}

fn default_status() -> String {
    "active".to_string()
}

/// One variant embedded in a remote product payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVariant {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// The API serializes prices as strings ("19.90").
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default = "default_position")]
    pub position: i64,
    pub inventory_item_id: i64,
}

fn default_position() -> i64 {
    1
}

impl RemoteVariant {
    /// Price parsed as f64, defaulting to 0 on absent/malformed values.
    pub fn price_f64(&self) -> f64 {
        self.price
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0.0)
    }
}

/// One inventory level as returned by `GET /inventory_levels.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInventoryLevel {
    pub inventory_item_id: i64,
    pub location_id: i64,
    /// `null` when the item is untracked at this location.
    #[serde(default)]
    pub available: Option<i64>,
}

/// One page of a cursor-paginated product listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<RemoteProduct>,
    /// Opaque `page_info` cursor for the next page; `None` when exhausted.
    pub next_cursor: Option<String>,
}

/// A webhook subscription as returned by the webhooks endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteWebhook {
    pub id: i64,
    pub topic: String,
    pub address: String,
}

/// Fields the core pushes back to the remote product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    /// active | draft | archived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProductPatch {
    pub fn hide() -> Self {
        Self {
            status: Some("draft".to_string()),
        }
    }

    pub fn show() -> Self {
        Self {
            status: Some("active".to_string()),
        }
    }
}

/// Parse a remote ISO-8601 timestamp ("2023-01-01T12:00:00-00:00") into
/// unix milliseconds. Returns `None` on absent or malformed input.
pub fn parse_remote_datetime(value: Option<&str>) -> Option<i64> {
    let raw = value?;
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_datetime() {
        let millis = parse_remote_datetime(Some("2024-01-01T00:00:00+00:00")).unwrap();
        assert_eq!(millis, 1_704_067_200_000);
        assert_eq!(parse_remote_datetime(None), None);
        assert_eq!(parse_remote_datetime(Some("not-a-date")), None);
    }

    #[test]
    fn variant_price_parsing() {
        let v = RemoteVariant {
            id: 1,
            title: "Default".into(),
            sku: None,
            price: Some("19.90".into()),
            position: 1,
            inventory_item_id: 10,
        };
        assert_eq!(v.price_f64(), 19.90);
    }
}

//! Catalog record types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use easykart_core::ProductId;

/// Authoritative product data from the catalog service.
///
/// Unknown fields are kept in `extra` so display code can reach them without
/// this type having to track every field the service adds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identifier (numeric or string on the wire).
    pub id: ProductId,
    /// Display name.
    #[serde(default, alias = "title")]
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Image URL.
    #[serde(default, alias = "thumbnail")]
    pub image: Option<String>,
    /// Long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Average rating.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Any other fields returned by the service.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Product list payload: either a bare array or wrapped in an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductListResponse {
    Bare(Vec<ProductRecord>),
    Data { data: Vec<ProductRecord> },
    Products { products: Vec<ProductRecord> },
}

impl ProductListResponse {
    pub(crate) fn into_records(self) -> Vec<ProductRecord> {
        match self {
            Self::Bare(records) | Self::Data { data: records } | Self::Products { products: records } => {
                records
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_service_shape() {
        let record: ProductRecord = serde_json::from_str(
            r#"{
                "id": 3,
                "title": "Canvas Bag",
                "price": 34.5,
                "thumbnail": "https://cdn.example.com/bag.jpg",
                "description": "Sturdy",
                "category": "bags",
                "rating": 4.2,
                "stock": 17
            }"#,
        )
        .unwrap();

        assert_eq!(record.id, ProductId::from("3"));
        assert_eq!(record.name, "Canvas Bag");
        assert_eq!(record.price, Decimal::new(345, 1));
        assert_eq!(record.image.as_deref(), Some("https://cdn.example.com/bag.jpg"));
        assert_eq!(record.extra.get("stock"), Some(&serde_json::json!(17)));
    }

    #[test]
    fn test_record_requires_price() {
        let result = serde_json::from_str::<ProductRecord>(r#"{"id": 1, "title": "Free?"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_response_shapes() {
        let bare: ProductListResponse =
            serde_json::from_str(r#"[{"id":1,"title":"a","price":1}]"#).unwrap();
        assert_eq!(bare.into_records().len(), 1);

        let data: ProductListResponse = serde_json::from_str(
            r#"{"data":[{"id":1,"title":"a","price":1},{"id":2,"title":"b","price":2}],"meta":{}}"#,
        )
        .unwrap();
        assert_eq!(data.into_records().len(), 2);

        let products: ProductListResponse =
            serde_json::from_str(r#"{"products":[],"total":0}"#).unwrap();
        assert!(products.into_records().is_empty());
    }
}

//! Document schema and normalization.
//!
//! Everything written by this crate carries `schemaVersion: 2` and the
//! canonical field names. Documents without a version are treated as the
//! first-generation storefront shape (`products[]`, `productId`, `approval`,
//! millisecond `timestamp`, `color`/`colors`, `size`/`sizes`) and are
//! normalized on read, so the engine only ever sees one shape. A rewrite
//! stores the canonical form.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::{path, Document};
use crate::domain::{
    sort_most_recent_first, CatalogItem, LineStatus, Order, OrderLine, PaymentMethod,
};

pub const SCHEMA_VERSION: u64 = 2;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("{path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("{path}: unsupported schema version {version}")]
    UnsupportedVersion { path: String, version: u64 },
    #[error("could not encode document: {0}")]
    Encode(String),
}

/// Canonical body plus the `schemaVersion` marker; readers ignore the marker.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Versioned<'a, T> {
    schema_version: u64,
    #[serde(flatten)]
    body: &'a T,
}

enum Generation {
    Legacy,
    Current,
}

fn generation(doc: &Document) -> Result<Generation, SchemaError> {
    match doc.data.get("schemaVersion").and_then(Value::as_u64) {
        None => Ok(Generation::Legacy),
        Some(SCHEMA_VERSION) => Ok(Generation::Current),
        Some(version) => Err(SchemaError::UnsupportedVersion {
            path: doc.path.clone(),
            version,
        }),
    }
}

fn malformed(doc: &Document, reason: impl ToString) -> SchemaError {
    SchemaError::Malformed {
        path: doc.path.clone(),
        reason: reason.to_string(),
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Value, SchemaError> {
    serde_json::to_value(Versioned {
        schema_version: SCHEMA_VERSION,
        body,
    })
    .map_err(|e| SchemaError::Encode(e.to_string()))
}

// =============================================================================
// ORDERS
// =============================================================================

pub fn encode_order(order: &Order) -> Result<Value, SchemaError> {
    encode(order)
}

pub fn decode_order(doc: &Document) -> Result<Order, SchemaError> {
    let mut order = match generation(doc)? {
        Generation::Current => {
            serde_json::from_value::<Order>(doc.data.clone()).map_err(|e| malformed(doc, e))?
        }
        Generation::Legacy => {
            let legacy: LegacyOrder =
                serde_json::from_value(doc.data.clone()).map_err(|e| malformed(doc, e))?;
            legacy.normalize(doc)?
        }
    };
    order.id = doc.id.clone();
    Ok(order)
}

/// Decodes a collection snapshot, skipping documents that fail to decode.
pub fn decode_orders(docs: &[Document]) -> Vec<Order> {
    let mut orders: Vec<Order> = docs
        .iter()
        .filter_map(|doc| match decode_order(doc) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable order");
                None
            }
        })
        .collect();
    sort_most_recent_first(&mut orders);
    orders
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyId {
    Text(String),
    Number(i64),
}

impl LegacyId {
    fn into_string(self) -> String {
        match self {
            LegacyId::Text(text) => text,
            LegacyId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyOrder {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    products: Vec<LegacyLine>,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    payment_method: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyLine {
    product_id: LegacyId,
    product_name: String,
    product_price: f64,
    #[serde(default)]
    product_size: Option<String>,
    #[serde(default)]
    product_color: Option<String>,
    quantity: u32,
    #[serde(default)]
    saved_at: Option<String>,
    #[serde(default)]
    approval: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl LegacyOrder {
    fn normalize(self, doc: &Document) -> Result<Order, SchemaError> {
        let owner_id = self
            .user_id
            .or_else(|| path::owner_of(&doc.path).map(str::to_string))
            .ok_or_else(|| malformed(doc, "missing owner"))?;

        let placed_at = self
            .timestamp
            .and_then(|millis| Utc.timestamp_millis_opt(millis as i64).single())
            .unwrap_or_default();

        let payment_method = match self.payment_method.as_deref() {
            Some(tag) => tag.parse::<PaymentMethod>().map_err(|e| malformed(doc, e))?,
            None => PaymentMethod::Card,
        };

        let lines = self
            .products
            .into_iter()
            .map(|line| line.normalize(doc, placed_at))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: doc.id.clone(),
            owner_id,
            payment_method,
            placed_at,
            lines,
        })
    }
}

impl LegacyLine {
    fn normalize(self, doc: &Document, placed_at: DateTime<Utc>) -> Result<OrderLine, SchemaError> {
        let status = match self.status.as_deref() {
            Some(raw) => raw.parse::<LineStatus>().map_err(|e| malformed(doc, e))?,
            None => LineStatus::Pending,
        };

        Ok(OrderLine {
            catalog_item_id: self.product_id.into_string(),
            name: self.product_name,
            unit_price: self.product_price,
            quantity: self.quantity,
            variant_size: self.product_size.filter(|s| !s.is_empty()),
            variant_color: self.product_color.filter(|s| !s.is_empty()),
            status,
            // Legacy writers could leave approval set on a cancelled line.
            approved: self.approval && status != LineStatus::Cancelled,
            saved_at: parse_time(self.saved_at.as_deref()).unwrap_or(placed_at),
            updated_at: parse_time(self.updated_at.as_deref()),
        })
    }
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

// =============================================================================
// CATALOG
// =============================================================================

pub fn encode_catalog_item(item: &CatalogItem) -> Result<Value, SchemaError> {
    encode(item)
}

pub fn decode_catalog_item(doc: &Document) -> Result<CatalogItem, SchemaError> {
    let mut item = match generation(doc)? {
        Generation::Current => {
            serde_json::from_value::<CatalogItem>(doc.data.clone())
                .map_err(|e| malformed(doc, e))?
        }
        Generation::Legacy => {
            let legacy: LegacyCatalogItem =
                serde_json::from_value(doc.data.clone()).map_err(|e| malformed(doc, e))?;
            legacy.normalize()
        }
    };
    item.id = doc.id.clone();
    Ok(item)
}

pub fn decode_catalog(docs: &[Document]) -> Vec<CatalogItem> {
    docs.iter()
        .filter_map(|doc| match decode_catalog_item(doc) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable catalog item");
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) if value.is_empty() => Vec::new(),
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCatalogItem {
    name: String,
    price: f64,
    #[serde(default)]
    stock_quantity: i64,
    #[serde(default)]
    color: Option<OneOrMany>,
    #[serde(default)]
    colors: Option<OneOrMany>,
    #[serde(default)]
    size: Option<OneOrMany>,
    #[serde(default)]
    sizes: Option<OneOrMany>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    last_updated: Option<String>,
}

impl LegacyCatalogItem {
    fn normalize(self) -> CatalogItem {
        CatalogItem {
            id: String::new(),
            name: self.name,
            price: self.price,
            stock_quantity: u32::try_from(self.stock_quantity.max(0)).unwrap_or(u32::MAX),
            color_options: self.colors.or(self.color).map(OneOrMany::into_vec).unwrap_or_default(),
            size_options: self.sizes.or(self.size).map(OneOrMany::into_vec).unwrap_or_default(),
            category: self.category,
            description: self.description,
            last_updated: parse_time(self.last_updated.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Selection;
    use serde_json::json;

    fn doc(path: &str, data: Value) -> Document {
        let (_, id) = path::split_document(path).unwrap();
        Document {
            id: id.to_string(),
            path: path.to_string(),
            version: 1,
            data,
        }
    }

    #[test]
    fn test_order_roundtrip_keeps_line_order() {
        let now = Utc::now();
        let tee = CatalogItem::new("tee", "Tee", 120.0, 5);
        let mug = CatalogItem::new("mug", "Mug", 80.0, 5);
        let order = Order {
            id: "o1".into(),
            owner_id: "alice".into(),
            payment_method: PaymentMethod::Wallet,
            placed_at: now,
            lines: vec![
                OrderLine::snapshot(&tee, &Selection::new("tee", 1), now),
                OrderLine::snapshot(&mug, &Selection::new("mug", 2).with_color("White"), now),
            ],
        };

        let data = encode_order(&order).unwrap();
        assert_eq!(data["schemaVersion"], 2);
        assert_eq!(data["paymentMethod"], "WALLET");
        assert!(data.get("id").is_none());

        let decoded = decode_order(&doc("customers/alice/orders/o1", data)).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_legacy_order_is_normalized() {
        let data = json!({
            "userId": "alice",
            "timestamp": 1_738_368_000_000_i64,
            "paymentMethod": "GCASH",
            "products": [{
                "productId": 7,
                "productName": "Lanyard",
                "productPrice": 45,
                "productSize": "",
                "quantity": 3,
                "savedAt": "2025-02-01T00:00:00.000Z",
                "approval": true,
                "status": "cancelled",
                "updatedAt": ""
            }]
        });

        let order = decode_order(&doc("customers/alice/orders/legacy", data)).unwrap();
        assert_eq!(order.id, "legacy");
        assert_eq!(order.owner_id, "alice");
        assert_eq!(order.payment_method, PaymentMethod::Wallet);

        let line = &order.lines[0];
        assert_eq!(line.catalog_item_id, "7");
        assert_eq!(line.unit_price, 45.0);
        assert_eq!(line.variant_size, None);
        assert_eq!(line.status, LineStatus::Cancelled);
        assert!(!line.approved);
        assert_eq!(line.updated_at, None);
        assert_eq!(line.saved_at, order.placed_at);
    }

    #[test]
    fn test_future_schema_is_rejected() {
        let data = json!({"schemaVersion": 3});
        let result = decode_order(&doc("customers/alice/orders/o9", data));
        assert!(matches!(result, Err(SchemaError::UnsupportedVersion { version: 3, .. })));
    }

    #[test]
    fn test_legacy_catalog_variants() {
        let single = doc(
            "catalog/tee",
            json!({"name": "Tee", "price": 120, "stockQuantity": -2, "color": "Black", "size": ["S", "M"]}),
        );
        let item = decode_catalog_item(&single).unwrap();
        assert_eq!(item.id, "tee");
        assert_eq!(item.stock_quantity, 0);
        assert_eq!(item.color_options, vec!["Black"]);
        assert_eq!(item.size_options, vec!["S", "M"]);

        let plural = doc(
            "catalog/cap",
            json!({"name": "Cap", "price": 90, "stockQuantity": 4, "colors": ["Red", "Blue"], "lastUpdated": "February 1, 2025"}),
        );
        let item = decode_catalog_item(&plural).unwrap();
        assert_eq!(item.color_options, vec!["Red", "Blue"]);
        assert!(item.size_options.is_empty());
        assert_eq!(item.last_updated, None);
    }

    #[test]
    fn test_decode_orders_skips_garbage() {
        let docs = vec![
            doc("customers/alice/orders/bad", json!({"products": "nope"})),
            doc(
                "customers/alice/orders/ok",
                json!({"userId": "alice", "products": [{"productId": "tee", "productName": "Tee", "productPrice": 1, "quantity": 1}]}),
            ),
        ];
        let orders = decode_orders(&docs);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "ok");
    }
}

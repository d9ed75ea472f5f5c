use thiserror::Error;

use crate::domain::PolicyViolation;
use crate::store::schema::SchemaError;
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Catalog item not found: {0}")]
    NotFound(String),
    #[error("Catalog item {0} kept changing, giving up")]
    Conflict(String),
    #[error("Malformed catalog data: {0}")]
    Schema(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SchemaError> for CatalogError {
    fn from(error: SchemaError) -> Self {
        CatalogError::Schema(error.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order {order_id} has no line for catalog item {catalog_item_id}")]
    LineNotFound {
        order_id: String,
        catalog_item_id: String,
    },
    #[error("Catalog item not found: {0}")]
    CatalogItemNotFound(String),
    #[error("An order needs at least one selection")]
    EmptySelection,
    #[error("Invalid quantity for catalog item {0}")]
    InvalidQuantity(String),
    #[error("Store unavailable: {0}")]
    TransientIo(String),
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Malformed order data: {0}")]
    Schema(String),
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(path) => OrderError::NotFound(path),
            StoreError::Conflict { .. } => OrderError::Conflict(error.to_string()),
            StoreError::Unavailable(msg) => OrderError::TransientIo(msg),
            StoreError::InvalidPath(_) | StoreError::NotAnObject(_) => {
                OrderError::Schema(error.to_string())
            }
        }
    }
}

impl From<PolicyViolation> for OrderError {
    fn from(violation: PolicyViolation) -> Self {
        OrderError::InvariantViolation(violation.0)
    }
}

impl From<SchemaError> for OrderError {
    fn from(error: SchemaError) -> Self {
        OrderError::Schema(error.to_string())
    }
}

impl From<CatalogError> for OrderError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(id) => OrderError::CatalogItemNotFound(id),
            CatalogError::Conflict(_) => OrderError::Conflict(error.to_string()),
            CatalogError::Schema(msg) => OrderError::Schema(msg),
            CatalogError::Store(store) => store.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

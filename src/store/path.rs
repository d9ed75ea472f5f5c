//! Hierarchical document paths.
//!
//! Collections have an odd number of segments (`customers/alice/orders`),
//! documents an even number (`customers/alice/orders/o1`).

use super::StoreError;

pub const CUSTOMERS: &str = "customers";
pub const CATALOG: &str = "catalog";
pub const USERS: &str = "users";

pub fn customer(owner_id: &str) -> String {
    format!("{CUSTOMERS}/{owner_id}")
}

pub fn orders(owner_id: &str) -> String {
    format!("{CUSTOMERS}/{owner_id}/orders")
}

pub fn order(owner_id: &str, order_id: &str) -> String {
    format!("{CUSTOMERS}/{owner_id}/orders/{order_id}")
}

pub fn catalog_item(item_id: &str) -> String {
    format!("{CATALOG}/{item_id}")
}

pub fn profile(owner_id: &str) -> String {
    format!("{USERS}/{owner_id}")
}

/// Splits a document path into its collection path and document id.
pub fn split_document(path: &str) -> Result<(&str, &str), StoreError> {
    let segments = segment_count(path)?;
    if segments % 2 != 0 {
        return Err(StoreError::InvalidPath(format!(
            "{path} names a collection, not a document"
        )));
    }
    match path.rsplit_once('/') {
        Some((collection, id)) => Ok((collection, id)),
        None => Err(StoreError::InvalidPath(path.to_string())),
    }
}

pub fn validate_collection(path: &str) -> Result<(), StoreError> {
    if segment_count(path)? % 2 == 0 {
        return Err(StoreError::InvalidPath(format!(
            "{path} names a document, not a collection"
        )));
    }
    Ok(())
}

/// Owner segment of a `customers/{owner}/...` path.
pub fn owner_of(path: &str) -> Option<&str> {
    let mut segments = path.split('/');
    match (segments.next(), segments.next()) {
        (Some(CUSTOMERS), Some(owner)) if !owner.is_empty() => Some(owner),
        _ => None,
    }
}

fn segment_count(path: &str) -> Result<usize, StoreError> {
    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(path.split('/').count())
}

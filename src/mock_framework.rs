//! # Mock Framework
//!
//! Utilities for testing clients without a running store actor.
//!
//! [`create_mock_store`] hands back a [`StoreClient`] and the receiving end of
//! its channel. Tests then pull requests off the channel with the `expect_*`
//! helpers, assert on them, and answer through the reply sender. That makes
//! failures, version conflicts and request ordering fully scripted.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::store::{Document, SetOptions, StoreClient, StoreRequest, StoreResponse};

pub fn create_mock_store(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Next request must be a `Get`.
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, StoreResponse<Option<Document>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { path, respond_to }) => Some((path, respond_to)),
        _ => None,
    }
}

/// Next request must be a `Set`.
pub async fn expect_set(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, Value, SetOptions, StoreResponse<u64>)> {
    match receiver.recv().await {
        Some(StoreRequest::Set {
            path,
            data,
            options,
            respond_to,
        }) => Some((path, data, options, respond_to)),
        _ => None,
    }
}

/// Next request must be a `List`.
pub async fn expect_list(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, StoreResponse<Vec<Document>>)> {
    match receiver.recv().await {
        Some(StoreRequest::List {
            collection,
            respond_to,
        }) => Some((collection, respond_to)),
        _ => None,
    }
}

/// A document as the store would return it.
pub fn document(path: &str, version: u64, data: Value) -> Document {
    let id = path.rsplit('/').next().unwrap_or_default().to_string();
    Document {
        id,
        path: path.to_string(),
        version,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::app_system::OrderError;
    use crate::clients::{CatalogClient, OrderClient, Storefront};
    use crate::clock::ManualClock;
    use crate::domain::{Cart, CatalogItem, LineStatus, PaymentMethod, Selection, Session};
    use crate::store::{path, StoreError};

    fn clients(store: StoreClient, attempts: u32) -> OrderClient {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()));
        let catalog = CatalogClient::new(store.clone(), clock.clone(), attempts);
        OrderClient::new(store, catalog, clock, attempts)
    }

    fn stored_order(status: &str) -> Value {
        json!({
            "schemaVersion": 2,
            "ownerId": "alice",
            "paymentMethod": "CARD",
            "placedAt": "2024-05-01T08:00:00Z",
            "lines": [{
                "catalogItemId": "mug",
                "name": "Mug",
                "unitPrice": 150.0,
                "quantity": 1,
                "status": status,
                "approved": false,
                "savedAt": "2024-05-01T08:00:00Z"
            }]
        })
    }

    #[tokio::test]
    async fn test_mock_store() {
        let (store, mut receiver) = create_mock_store(10);

        let task = tokio::spawn(async move { store.get_document("catalog/mug".into()).await });

        let (path, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(path, "catalog/mug");
        responder.send(Ok(None)).unwrap();

        assert_eq!(task.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_place_order_request_sequence() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3).with_id_generator(|| "order_1".to_string());

        let task = tokio::spawn(async move {
            orders
                .place_order("alice", PaymentMethod::Card, &[Selection::new("mug", 2)])
                .await
        });

        // Catalog lookup for the snapshot
        let (path, responder) = expect_get(&mut receiver).await.expect("Expected catalog Get");
        assert_eq!(path, "catalog/mug");
        responder
            .send(Ok(Some(document(&path, 4, json!({"schemaVersion": 2, "name": "Mug", "price": 150.0, "stockQuantity": 1})))))
            .unwrap();

        // Bare customer marker
        let (path, data, options, responder) = expect_set(&mut receiver).await.expect("Expected marker Set");
        assert_eq!(path, "customers/alice");
        assert!(options.merge);
        assert_eq!(data, json!({"ownerId": "alice"}));
        responder.send(Ok(1)).unwrap();

        // Order document, create-only
        let (path, data, options, responder) = expect_set(&mut receiver).await.expect("Expected order Set");
        assert_eq!(path, "customers/alice/orders/order_1");
        assert_eq!(options, SetOptions::create_only());
        assert_eq!(data["lines"][0]["unitPrice"], 150.0);
        responder.send(Ok(1)).unwrap();

        // lastOrderAt only once the order is stored
        let (path, data, options, responder) = expect_set(&mut receiver).await.expect("Expected lastOrderAt Set");
        assert_eq!(path, "customers/alice");
        assert!(options.merge);
        assert_eq!(data["lastOrderAt"], json!(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()));
        responder.send(Ok(2)).unwrap();

        // Deduction: read, then versioned write clamped at zero
        let (_, responder) = expect_get(&mut receiver).await.expect("Expected stock Get");
        responder
            .send(Ok(Some(document("catalog/mug", 4, json!({"schemaVersion": 2, "name": "Mug", "price": 150.0, "stockQuantity": 1})))))
            .unwrap();
        let (_, data, options, responder) = expect_set(&mut receiver).await.expect("Expected stock Set");
        assert_eq!(options, SetOptions::if_version(4));
        assert_eq!(data["stockQuantity"], 0);
        responder.send(Ok(5)).unwrap();

        assert_eq!(task.await.unwrap(), Ok("order_1".to_string()));
    }

    #[tokio::test]
    async fn test_failed_deduction_keeps_order() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3).with_id_generator(|| "order_1".to_string());

        let task = tokio::spawn(async move {
            orders
                .place_order("alice", PaymentMethod::Wallet, &[Selection::new("mug", 1)])
                .await
        });

        let (path, responder) = expect_get(&mut receiver).await.unwrap();
        responder
            .send(Ok(Some(document(&path, 1, json!({"schemaVersion": 2, "name": "Mug", "price": 150.0, "stockQuantity": 3})))))
            .unwrap();
        for _ in 0..3 {
            let (_, _, _, responder) = expect_set(&mut receiver).await.unwrap();
            responder.send(Ok(1)).unwrap();
        }

        let (_, responder) = expect_get(&mut receiver).await.unwrap();
        responder
            .send(Err(StoreError::Unavailable("connection reset".into())))
            .unwrap();

        assert_eq!(task.await.unwrap(), Ok("order_1".to_string()));
    }

    /// Answers the catalog lookup and the bare marker write of a placement,
    /// then fails the order write.
    async fn fail_order_write(receiver: &mut mpsc::Receiver<StoreRequest>) {
        let (path, responder) = expect_get(receiver).await.expect("Expected catalog Get");
        assert_eq!(path, "catalog/mug");
        responder
            .send(Ok(Some(document(&path, 4, json!({"schemaVersion": 2, "name": "Mug", "price": 150.0, "stockQuantity": 9})))))
            .unwrap();

        let (path, _, _, responder) = expect_set(receiver).await.expect("Expected marker Set");
        assert_eq!(path, "customers/alice");
        responder.send(Ok(1)).unwrap();

        let (path, _, options, responder) = expect_set(receiver).await.expect("Expected order Set");
        assert_eq!(path, "customers/alice/orders/order_1");
        assert_eq!(options, SetOptions::create_only());
        responder
            .send(Err(StoreError::Unavailable("connection reset".into())))
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_order_write_skips_deduction() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3).with_id_generator(|| "order_1".to_string());

        let task = tokio::spawn(async move {
            orders
                .place_order("alice", PaymentMethod::Card, &[Selection::new("mug", 2)])
                .await
        });

        fail_order_write(&mut receiver).await;

        assert_eq!(
            task.await.unwrap(),
            Err(OrderError::TransientIo("connection reset".into()))
        );
        // No stock read or write, and no lastOrderAt, after the failed order write.
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store.clone(), 3).with_id_generator(|| "order_1".to_string());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()));
        let storefront = Storefront::new(Session::customer("alice"), orders, CatalogClient::new(store, clock, 3));

        let mut cart = Cart::new();
        cart.add(&CatalogItem::new("mug", "Mug", 150.0, 9), 2, None, Some("White"));
        let before = cart.clone();

        let task = tokio::spawn(async move {
            let result = storefront.checkout(&mut cart, PaymentMethod::Card).await;
            (result, cart)
        });

        fail_order_write(&mut receiver).await;

        let (result, cart) = task.await.unwrap();
        assert_eq!(result, Err(OrderError::TransientIo("connection reset".into())));
        assert_eq!(cart, before);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transient_failure_propagates() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3);

        let task = tokio::spawn(async move {
            orders
                .update_line_status("alice", "o1", "mug", LineStatus::Completed)
                .await
        });

        let (_, responder) = expect_get(&mut receiver).await.unwrap();
        responder
            .send(Err(StoreError::Unavailable("connection reset".into())))
            .unwrap();

        assert_eq!(
            task.await.unwrap(),
            Err(OrderError::TransientIo("connection reset".into()))
        );
    }

    #[tokio::test]
    async fn test_conflict_retries_from_fresh_read() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3);
        let order_path = path::order("alice", "o1");

        let task = tokio::spawn(async move {
            orders
                .update_line_status("alice", "o1", "mug", LineStatus::Cancelled)
                .await
        });

        let (path, responder) = expect_get(&mut receiver).await.unwrap();
        assert_eq!(path, order_path);
        responder.send(Ok(Some(document(&path, 1, stored_order("pending"))))).unwrap();

        let (path, _, options, responder) = expect_set(&mut receiver).await.unwrap();
        assert_eq!(options, SetOptions::if_version(1));
        responder
            .send(Err(StoreError::Conflict {
                path,
                expected: 1,
                actual: 2,
            }))
            .unwrap();

        let (path, responder) = expect_get(&mut receiver).await.unwrap();
        responder.send(Ok(Some(document(&path, 2, stored_order("pending"))))).unwrap();

        let (_, data, options, responder) = expect_set(&mut receiver).await.unwrap();
        assert_eq!(options, SetOptions::if_version(2));
        assert_eq!(data["lines"][0]["status"], "cancelled");
        assert_eq!(data["lines"][0]["approved"], false);
        responder.send(Ok(3)).unwrap();

        let order = task.await.unwrap().unwrap();
        assert_eq!(order.id, "o1");
        assert_eq!(order.lines[0].status, LineStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_conflict_gives_up_after_max_attempts() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 2);

        let task = tokio::spawn(async move {
            orders.update_line_approval("alice", "o1", "mug", true).await
        });

        for version in 1..=2 {
            let (path, responder) = expect_get(&mut receiver).await.unwrap();
            responder
                .send(Ok(Some(document(&path, version, stored_order("pending")))))
                .unwrap();
            let (path, _, _, responder) = expect_set(&mut receiver).await.unwrap();
            responder
                .send(Err(StoreError::Conflict {
                    path,
                    expected: version,
                    actual: version + 1,
                }))
                .unwrap();
        }

        assert!(matches!(task.await.unwrap(), Err(OrderError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_orders_skips_bad_documents() {
        let (store, mut receiver) = create_mock_store(10);
        let orders = clients(store, 3);

        let task = tokio::spawn(async move { orders.list_orders("alice").await });

        let (collection, responder) = expect_list(&mut receiver).await.unwrap();
        assert_eq!(collection, "customers/alice/orders");
        responder
            .send(Ok(vec![
                document("customers/alice/orders/o1", 1, stored_order("completed")),
                document("customers/alice/orders/bad", 1, json!({"schemaVersion": 2, "lines": "nope"})),
            ]))
            .unwrap();

        let listed = task.await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].lines[0].status, LineStatus::Completed);
    }
}

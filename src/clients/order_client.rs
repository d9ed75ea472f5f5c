use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::app_system::OrderError;
use crate::clients::CatalogClient;
use crate::clock::Clock;
use crate::domain::{LineStatus, Order, OrderLine, PaymentMethod, PolicyViolation, Selection};
use crate::store::{path, schema, SetOptions, StoreClient, StoreError};
use crate::sync::{self, Subscription};

type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// The order engine.
///
/// Places orders as a single document per order and applies per-line
/// transitions. Transitions are optimistic: the order is read, the matching
/// lines are changed and the whole document is written back pinned to the
/// version that was read. A concurrent writer makes the write fail, and the
/// engine starts over from a fresh read, so no update is lost.
///
/// The engine is permissive about which transitions it accepts; callers
/// that need stricter rules pass a guard (see [`crate::domain::LinePolicy`]).
#[derive(Clone)]
pub struct OrderClient {
    store: StoreClient,
    catalog: CatalogClient,
    clock: Arc<dyn Clock>,
    next_id: IdGenerator,
    max_update_attempts: u32,
}

impl OrderClient {
    pub fn new(
        store: StoreClient,
        catalog: CatalogClient,
        clock: Arc<dyn Clock>,
        max_update_attempts: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            next_id: Arc::new(|| Uuid::new_v4().to_string()),
            max_update_attempts,
        }
    }

    /// Replaces the random order id generator.
    pub fn with_id_generator<F>(mut self, next_id: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.next_id = Arc::new(next_id);
        self
    }

    /// Places an order and returns its id.
    ///
    /// Every selection is resolved and snapshotted before anything is
    /// written. Stock is deducted after the order is stored; a failed
    /// deduction is logged and does not undo the order.
    #[instrument(skip(self, selections), fields(lines = selections.len()))]
    pub async fn place_order(
        &self,
        owner_id: &str,
        payment_method: PaymentMethod,
        selections: &[Selection],
    ) -> Result<String, OrderError> {
        info!("Processing place_order request");

        if selections.is_empty() {
            return Err(OrderError::EmptySelection);
        }
        if let Some(selection) = selections.iter().find(|s| s.quantity == 0) {
            return Err(OrderError::InvalidQuantity(selection.catalog_item_id.clone()));
        }

        let now = self.clock.now();
        let mut lines = Vec::with_capacity(selections.len());
        for selection in selections {
            let item = self.catalog.require_item(&selection.catalog_item_id).await?;
            lines.push(OrderLine::snapshot(&item, selection, now));
        }

        let order = Order {
            id: (self.next_id)(),
            owner_id: owner_id.to_string(),
            payment_method,
            placed_at: now,
            lines,
        };

        // The bare marker is what the all-orders feed discovers owners by;
        // `lastOrderAt` is only recorded once the order itself is stored.
        self.store
            .set_document(
                path::customer(owner_id),
                json!({ "ownerId": owner_id }),
                SetOptions::merge(),
            )
            .await?;
        self.store
            .set_document(
                path::order(owner_id, &order.id),
                schema::encode_order(&order)?,
                SetOptions::create_only(),
            )
            .await?;
        self.store
            .set_document(
                path::customer(owner_id),
                json!({ "lastOrderAt": now }),
                SetOptions::merge(),
            )
            .await?;
        info!(order_id = %order.id, total = order.total(), "Order stored");

        for line in &order.lines {
            if let Err(e) = self.catalog.deduct_stock(&line.catalog_item_id, line.quantity).await {
                warn!(
                    order_id = %order.id,
                    catalog_item_id = %line.catalog_item_id,
                    error = %e,
                    "Stock deduction failed"
                );
            }
        }

        Ok(order.id)
    }

    /// Sets the status of every line for `catalog_item_id`. A cancelled line
    /// is disapproved in the same write; any other status approves it.
    pub async fn update_line_status(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        status: LineStatus,
    ) -> Result<Order, OrderError> {
        self.update_line_status_guarded(owner_id, order_id, catalog_item_id, status, |_| Ok(()))
            .await
    }

    /// Sets the approval flag of every line for `catalog_item_id`.
    pub async fn update_line_approval(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        approved: bool,
    ) -> Result<Order, OrderError> {
        self.update_line_approval_guarded(owner_id, order_id, catalog_item_id, approved, |_| Ok(()))
            .await
    }

    #[instrument(skip(self, guard))]
    pub(crate) async fn update_line_status_guarded<G>(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        status: LineStatus,
        guard: G,
    ) -> Result<Order, OrderError>
    where
        G: Fn(&OrderLine) -> Result<(), PolicyViolation>,
    {
        self.rewrite_lines(owner_id, order_id, catalog_item_id, guard, |line, now| {
            line.set_status(status, now)
        })
        .await
    }

    #[instrument(skip(self, guard))]
    pub(crate) async fn update_line_approval_guarded<G>(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        approved: bool,
        guard: G,
    ) -> Result<Order, OrderError>
    where
        G: Fn(&OrderLine) -> Result<(), PolicyViolation>,
    {
        self.rewrite_lines(owner_id, order_id, catalog_item_id, guard, |line, now| {
            line.set_approval(approved, now)
        })
        .await
    }

    async fn rewrite_lines<G, M>(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        guard: G,
        mutate: M,
    ) -> Result<Order, OrderError>
    where
        G: Fn(&OrderLine) -> Result<(), PolicyViolation>,
        M: Fn(&mut OrderLine, DateTime<Utc>),
    {
        let order_path = path::order(owner_id, order_id);

        for attempt in 1..=self.max_update_attempts {
            let doc = self
                .store
                .get_document(order_path.clone())
                .await?
                .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
            let mut order = schema::decode_order(&doc)?;

            let mut matched = false;
            for line in order.lines_for(catalog_item_id) {
                guard(line)?;
                matched = true;
            }
            if !matched {
                return Err(OrderError::LineNotFound {
                    order_id: order_id.to_string(),
                    catalog_item_id: catalog_item_id.to_string(),
                });
            }

            let now = self.clock.now();
            order
                .lines
                .iter_mut()
                .filter(|line| line.catalog_item_id == catalog_item_id)
                .for_each(|line| mutate(line, now));

            match self
                .store
                .set_document(
                    order_path.clone(),
                    schema::encode_order(&order)?,
                    SetOptions::if_version(doc.version),
                )
                .await
            {
                Ok(version) => {
                    debug!(version, "Order lines rewritten");
                    return Ok(order);
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(attempt, "Order changed underneath, retrying");
                }
                Err(e) => {
                    error!(error = %e, "Order rewrite failed");
                    return Err(e.into());
                }
            }
        }

        warn!(attempts = self.max_update_attempts, "Giving up on order rewrite");
        Err(OrderError::Conflict(format!(
            "order {order_id} kept changing after {} attempts",
            self.max_update_attempts
        )))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, owner_id: &str, order_id: &str) -> Result<Order, OrderError> {
        let doc = self
            .store
            .get_document(path::order(owner_id, order_id))
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        Ok(schema::decode_order(&doc)?)
    }

    /// One customer's orders, most recent first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, owner_id: &str) -> Result<Vec<Order>, OrderError> {
        let docs = self.store.list_documents(path::orders(owner_id)).await?;
        Ok(schema::decode_orders(&docs))
    }

    /// Ids of every customer that has placed an order.
    #[instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<String>, OrderError> {
        let docs = self.store.list_documents(path::CUSTOMERS.to_string()).await?;
        Ok(docs.into_iter().map(|doc| doc.id).collect())
    }

    /// Live list of one customer's orders.
    pub async fn subscribe(&self, owner_id: &str) -> Result<Subscription<Order>, OrderError> {
        Ok(sync::watch_orders(&self.store, owner_id).await?)
    }

    /// Live list of every customer's orders.
    pub async fn subscribe_all(&self) -> Result<Subscription<Order>, OrderError> {
        Ok(sync::watch_all_orders(self.store.clone()).await?)
    }
}

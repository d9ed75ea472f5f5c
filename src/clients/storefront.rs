use tracing::{info, instrument};

use crate::app_system::OrderError;
use crate::clients::{CatalogClient, OrderClient};
use crate::domain::{check_customer_cancel, Cart, CatalogItem, LineKey, LineStatus, Order, PaymentMethod, Selection, Session};
use crate::sync::Subscription;

/// Customer-facing operations, bound to one session.
#[derive(Clone)]
pub struct Storefront {
    session: Session,
    orders: OrderClient,
    catalog: CatalogClient,
}

impl Storefront {
    pub(crate) fn new(session: Session, orders: OrderClient, catalog: CatalogClient) -> Self {
        Self {
            session,
            orders,
            catalog,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Orders everything in the cart. The cart is emptied only if the order
    /// was placed.
    #[instrument(skip(self, cart), fields(owner_id = %self.session.owner_id, entries = cart.entries().len()))]
    pub async fn checkout(&self, cart: &mut Cart, payment_method: PaymentMethod) -> Result<String, OrderError> {
        let order_id = self
            .orders
            .place_order(&self.session.owner_id, payment_method, &cart.selections())
            .await?;
        cart.clear();
        info!(order_id = %order_id, "Checked out cart");
        Ok(order_id)
    }

    /// Orders only the cart entries whose item is currently in stock and
    /// removes just those from the cart.
    #[instrument(skip(self, cart), fields(owner_id = %self.session.owner_id))]
    pub async fn checkout_available(
        &self,
        cart: &mut Cart,
        payment_method: PaymentMethod,
    ) -> Result<String, OrderError> {
        let catalog = self.catalog.list_items().await?;
        let selections = cart.selections_in_stock(&catalog);

        let order_id = self
            .orders
            .place_order(&self.session.owner_id, payment_method, &selections)
            .await?;
        for selection in &selections {
            cart.remove(&LineKey::new(
                selection.catalog_item_id.clone(),
                selection.variant_size.as_deref(),
                selection.variant_color.as_deref(),
            ));
        }
        info!(order_id = %order_id, ordered = selections.len(), left = cart.entries().len(), "Checked out available items");
        Ok(order_id)
    }

    /// Orders a single selection, leaving the cart alone.
    #[instrument(skip(self), fields(owner_id = %self.session.owner_id))]
    pub async fn buy_now(&self, selection: Selection, payment_method: PaymentMethod) -> Result<String, OrderError> {
        self.orders
            .place_order(&self.session.owner_id, payment_method, std::slice::from_ref(&selection))
            .await
    }

    /// Cancels a pending line of one of the customer's own orders.
    #[instrument(skip(self), fields(owner_id = %self.session.owner_id))]
    pub async fn cancel_line(&self, order_id: &str, catalog_item_id: &str) -> Result<Order, OrderError> {
        self.orders
            .update_line_status_guarded(
                &self.session.owner_id,
                order_id,
                catalog_item_id,
                LineStatus::Cancelled,
                check_customer_cancel,
            )
            .await
    }

    pub async fn orders(&self) -> Result<Vec<Order>, OrderError> {
        self.orders.list_orders(&self.session.owner_id).await
    }

    pub async fn my_orders(&self) -> Result<Subscription<Order>, OrderError> {
        self.orders.subscribe(&self.session.owner_id).await
    }

    pub async fn catalog(&self) -> Result<Vec<CatalogItem>, OrderError> {
        Ok(self.catalog.list_items().await?)
    }

    pub async fn live_catalog(&self) -> Result<Subscription<CatalogItem>, OrderError> {
        Ok(self.catalog.subscribe().await?)
    }
}

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use crate::app_system::OrderError;
use crate::clients::{CatalogClient, OrderClient, ProfileClient};
use crate::domain::{CatalogItem, LinePolicy, LineStatus, Order, Session};
use crate::sync::dashboard::{self, Dashboard};
use crate::sync::Subscription;

/// Admin-only operations. Only obtainable with an admin session.
#[derive(Clone)]
pub struct AdminConsole {
    session: Session,
    orders: OrderClient,
    catalog: CatalogClient,
    profiles: ProfileClient,
    policy: LinePolicy,
    recent_orders_limit: usize,
}

impl AdminConsole {
    pub(crate) fn new(
        session: Session,
        orders: OrderClient,
        catalog: CatalogClient,
        profiles: ProfileClient,
        policy: LinePolicy,
        recent_orders_limit: usize,
    ) -> Result<Self, OrderError> {
        if !session.is_admin() {
            warn!(owner_id = %session.owner_id, "Admin console refused");
            return Err(OrderError::Unauthorized(format!(
                "{} is not an admin",
                session.owner_id
            )));
        }
        Ok(Self {
            session,
            orders,
            catalog,
            profiles,
            policy,
            recent_orders_limit,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn policy(&self) -> LinePolicy {
        self.policy
    }

    #[instrument(skip(self), fields(admin = %self.session.owner_id))]
    pub async fn set_line_status(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        status: LineStatus,
    ) -> Result<Order, OrderError> {
        let policy = self.policy;
        let order = self
            .orders
            .update_line_status_guarded(owner_id, order_id, catalog_item_id, status, |line| {
                policy.check_status(line, status)
            })
            .await?;
        info!(%status, "Line status set");
        Ok(order)
    }

    #[instrument(skip(self), fields(admin = %self.session.owner_id))]
    pub async fn set_line_approval(
        &self,
        owner_id: &str,
        order_id: &str,
        catalog_item_id: &str,
        approved: bool,
    ) -> Result<Order, OrderError> {
        let policy = self.policy;
        let order = self
            .orders
            .update_line_approval_guarded(owner_id, order_id, catalog_item_id, approved, |line| {
                policy.check_approval(line, approved)
            })
            .await?;
        info!(approved, "Line approval set");
        Ok(order)
    }

    /// Live merged list of every customer's orders.
    pub async fn watch_all_orders(&self) -> Result<Subscription<Order>, OrderError> {
        self.orders.subscribe_all().await
    }

    /// Point-in-time overview across all customers.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard, OrderError> {
        let orders = self.all_orders().await?;
        Ok(dashboard::summarize(&orders, self.recent_orders_limit))
    }

    /// Overview computed from an already-merged snapshot, e.g. one delivered
    /// by [`watch_all_orders`](Self::watch_all_orders).
    pub fn summarize(&self, orders: &[Order]) -> Dashboard {
        dashboard::summarize(orders, self.recent_orders_limit)
    }

    /// Orders whose most recently saved line has `status`.
    pub async fn orders_by_status(&self, status: LineStatus) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.all_orders().await?;
        orders.retain(|order| order.representative_status() == status);
        Ok(orders)
    }

    /// Contact email per customer that has ordered.
    #[instrument(skip(self))]
    pub async fn customer_emails(&self) -> Result<BTreeMap<String, String>, OrderError> {
        let customers = self.orders.list_customers().await?;
        self.profiles.emails(customers.iter().map(String::as_str)).await
    }

    pub async fn upsert_product(&self, item: CatalogItem) -> Result<CatalogItem, OrderError> {
        Ok(self.catalog.upsert_item(item).await?)
    }

    pub async fn delete_product(&self, catalog_item_id: &str) -> Result<(), OrderError> {
        Ok(self.catalog.delete_item(catalog_item_id).await?)
    }

    async fn all_orders(&self) -> Result<Vec<Order>, OrderError> {
        let mut all = Vec::new();
        for owner_id in self.orders.list_customers().await? {
            all.extend(self.orders.list_orders(&owner_id).await?);
        }
        crate::domain::sort_most_recent_first(&mut all);
        Ok(all)
    }
}

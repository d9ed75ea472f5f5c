use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::app_system::CatalogError;
use crate::clock::Clock;
use crate::domain::CatalogItem;
use crate::store::{path, schema, SetOptions, StoreClient, StoreError};
use crate::sync::{self, Subscription};

/// Client for the catalog mirror.
///
/// Reads decode whatever shape is stored; writes always store the current
/// schema. Stock changes go through a versioned read-modify-write so two
/// concurrent checkouts never overwrite each other's deduction.
#[derive(Clone)]
pub struct CatalogClient {
    store: StoreClient,
    clock: Arc<dyn Clock>,
    max_update_attempts: u32,
}

impl CatalogClient {
    pub fn new(store: StoreClient, clock: Arc<dyn Clock>, max_update_attempts: u32) -> Self {
        Self {
            store,
            clock,
            max_update_attempts,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, catalog_item_id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        debug!("Fetching catalog item");
        match self.store.get_document(path::catalog_item(catalog_item_id)).await? {
            Some(doc) => Ok(Some(schema::decode_catalog_item(&doc)?)),
            None => Ok(None),
        }
    }

    /// Like [`get_item`](Self::get_item), but a missing item is an error.
    pub async fn require_item(&self, catalog_item_id: &str) -> Result<CatalogItem, CatalogError> {
        self.get_item(catalog_item_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(catalog_item_id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let docs = self.store.list_documents(path::CATALOG.to_string()).await?;
        Ok(schema::decode_catalog(&docs))
    }

    /// Creates or replaces an item, stamping `last_updated`.
    #[instrument(skip(self, item), fields(catalog_item_id = %item.id))]
    pub async fn upsert_item(&self, mut item: CatalogItem) -> Result<CatalogItem, CatalogError> {
        item.last_updated = Some(self.clock.now());
        let data = schema::encode_catalog_item(&item)?;
        self.store
            .set_document(path::catalog_item(&item.id), data, SetOptions::overwrite())
            .await?;
        info!(stock = item.stock_quantity, "Catalog item saved");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, catalog_item_id: &str) -> Result<(), CatalogError> {
        match self.store.delete_document(path::catalog_item(catalog_item_id)).await {
            Ok(()) => {
                info!("Catalog item deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(CatalogError::NotFound(catalog_item_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Lowers stock by `quantity`, never below zero. Returns the remaining stock.
    #[instrument(skip(self))]
    pub async fn deduct_stock(&self, catalog_item_id: &str, quantity: u32) -> Result<u32, CatalogError> {
        let item_path = path::catalog_item(catalog_item_id);

        for attempt in 1..=self.max_update_attempts {
            let doc = self
                .store
                .get_document(item_path.clone())
                .await?
                .ok_or_else(|| CatalogError::NotFound(catalog_item_id.to_string()))?;

            let mut item = schema::decode_catalog_item(&doc)?;
            let before = item.stock_quantity;
            let remaining = item.deduct(quantity);
            if remaining == before {
                return Ok(remaining);
            }

            let data = schema::encode_catalog_item(&item)?;
            match self
                .store
                .set_document(item_path.clone(), data, SetOptions::if_version(doc.version))
                .await
            {
                Ok(_) => {
                    debug!(before, remaining, "Stock deducted");
                    return Ok(remaining);
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(attempt, "Catalog item changed underneath, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts = self.max_update_attempts, "Giving up on stock deduction");
        Err(CatalogError::Conflict(catalog_item_id.to_string()))
    }

    /// Live view of the whole catalog.
    pub async fn subscribe(&self) -> Result<Subscription<CatalogItem>, CatalogError> {
        Ok(sync::watch_catalog(&self.store).await?)
    }
}

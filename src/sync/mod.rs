//! Push-based propagation of order and catalog changes.
//!
//! Every feed sits on top of a store listener for one collection, decodes
//! each snapshot into domain types and republishes it on its own watch
//! channel. The admin view fans one feed per customer into a single merged
//! list (see [`watch_all_orders`]).

pub mod dashboard;
mod fan_in;
pub mod registry;
mod subscription;

pub use fan_in::watch_all_orders;
pub use registry::SubscriptionRegistry;
pub use subscription::Subscription;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info_span, Instrument};

use crate::domain::{CatalogItem, Order};
use crate::store::{path, schema, Document, StoreClient, StoreError};

/// Live list of one customer's orders, most recent first.
pub async fn watch_orders(store: &StoreClient, owner_id: &str) -> Result<Subscription<Order>, StoreError> {
    watch_collection(store, path::orders(owner_id), schema::decode_orders).await
}

/// Live list of the whole catalog.
pub async fn watch_catalog(store: &StoreClient) -> Result<Subscription<CatalogItem>, StoreError> {
    watch_collection(store, path::CATALOG.to_string(), schema::decode_catalog).await
}

async fn watch_collection<T, F>(
    store: &StoreClient,
    collection: String,
    decode: F,
) -> Result<Subscription<T>, StoreError>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&[Document]) -> Vec<T> + Send + 'static,
{
    let mut source = store.subscribe(collection.clone()).await?;
    let initial = decode(source.borrow_and_update().as_slice());
    let (sender, receiver) = watch::channel(initial);
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

    let span = info_span!("feed", collection = %collection);
    let task = tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = source.changed() => {
                        if changed.is_err() {
                            debug!("Store closed the listener");
                            break;
                        }
                        let snapshot = decode(source.borrow_and_update().as_slice());
                        sender.send_replace(snapshot);
                    }
                }
            }
            debug!("Feed stopped");
        }
        .instrument(span),
    );

    Ok(Subscription::new(receiver, shutdown, task))
}

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{Subscription, SubscriptionRegistry};
use crate::domain::{sort_most_recent_first, Order};
use crate::store::{path, schema, Document, StoreClient, StoreError};

const UPDATE_BUFFER: usize = 64;

/// Snapshot pushed by a per-customer feed. `feed_id` lets the merger ignore
/// updates still queued from a feed that has since been replaced.
struct FeedUpdate {
    owner_id: String,
    feed_id: u64,
    orders: Vec<Order>,
}

struct OwnerFeed {
    feed_id: u64,
    orders: Vec<Order>,
}

/// Live list of every customer's orders, merged and sorted most recent first.
///
/// One feed runs per customer known to the store. Customers that appear
/// after the call are picked up automatically; customers that disappear have
/// their feed released. Cancelling the returned subscription releases the
/// customer listener and every per-customer listener.
pub async fn watch_all_orders(store: StoreClient) -> Result<Subscription<Order>, StoreError> {
    let mut customers = store.subscribe(path::CUSTOMERS.to_string()).await?;
    let (updates_tx, mut updates_rx) = mpsc::channel::<FeedUpdate>(UPDATE_BUFFER);

    let mut registry = SubscriptionRegistry::new();
    let mut feeds: BTreeMap<String, OwnerFeed> = BTreeMap::new();
    let mut next_feed_id = 0u64;

    let owners = owner_ids(customers.borrow_and_update().as_slice());
    for owner_id in owners {
        next_feed_id += 1;
        let (orders, task) = spawn_owner_feed(&store, &owner_id, next_feed_id, updates_tx.clone()).await?;
        feeds.insert(
            owner_id.clone(),
            OwnerFeed {
                feed_id: next_feed_id,
                orders,
            },
        );
        registry.insert(owner_id, task);
    }

    let (sender, receiver) = watch::channel(merge(&feeds));
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

    let span = info_span!("all_orders_feed");
    let task = tokio::spawn(
        async move {
            info!(customers = feeds.len(), "Merged order feed started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = customers.changed() => {
                        if changed.is_err() {
                            debug!("Store closed the customer listener");
                            break;
                        }
                        let owners = owner_ids(customers.borrow_and_update().as_slice());

                        let stale: Vec<String> = feeds
                            .keys()
                            .filter(|owner_id| !owners.contains(*owner_id))
                            .cloned()
                            .collect();
                        for owner_id in stale {
                            registry.remove(&owner_id);
                            feeds.remove(&owner_id);
                            debug!(owner_id = %owner_id, "Customer feed removed");
                        }

                        for owner_id in owners {
                            if registry.contains(&owner_id) {
                                continue;
                            }
                            next_feed_id += 1;
                            match spawn_owner_feed(&store, &owner_id, next_feed_id, updates_tx.clone()).await {
                                Ok((orders, task)) => {
                                    debug!(owner_id = %owner_id, "Customer feed added");
                                    feeds.insert(owner_id.clone(), OwnerFeed { feed_id: next_feed_id, orders });
                                    registry.insert(owner_id, task);
                                }
                                Err(e) => warn!(owner_id = %owner_id, error = %e, "Could not watch customer orders"),
                            }
                        }

                        sender.send_replace(merge(&feeds));
                    }
                    Some(update) = updates_rx.recv() => {
                        match feeds.get_mut(&update.owner_id) {
                            Some(feed) if feed.feed_id == update.feed_id => {
                                feed.orders = update.orders;
                                sender.send_replace(merge(&feeds));
                            }
                            _ => debug!(owner_id = %update.owner_id, "Dropping update from released feed"),
                        }
                    }
                }
            }

            registry.shutdown().await;
            info!("Merged order feed stopped");
        }
        .instrument(span),
    );

    Ok(Subscription::new(receiver, shutdown, task))
}

async fn spawn_owner_feed(
    store: &StoreClient,
    owner_id: &str,
    feed_id: u64,
    updates: mpsc::Sender<FeedUpdate>,
) -> Result<(Vec<Order>, JoinHandle<()>), StoreError> {
    let mut source = store.subscribe(path::orders(owner_id)).await?;
    let initial = schema::decode_orders(source.borrow_and_update().as_slice());

    let owner_id = owner_id.to_string();
    let span = info_span!("customer_feed", owner_id = %owner_id, feed_id);
    let task = tokio::spawn(
        async move {
            while source.changed().await.is_ok() {
                let orders = schema::decode_orders(source.borrow_and_update().as_slice());
                let update = FeedUpdate {
                    owner_id: owner_id.clone(),
                    feed_id,
                    orders,
                };
                if updates.send(update).await.is_err() {
                    break;
                }
            }
        }
        .instrument(span),
    );

    Ok((initial, task))
}

fn owner_ids(docs: &[Document]) -> BTreeSet<String> {
    docs.iter().map(|doc| doc.id.clone()).collect()
}

fn merge(feeds: &BTreeMap<String, OwnerFeed>) -> Vec<Order> {
    let mut merged: Vec<Order> = feeds
        .values()
        .flat_map(|feed| feed.orders.iter().cloned())
        .collect();
    sort_most_recent_first(&mut merged);
    merged
}

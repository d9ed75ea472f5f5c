use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app_system::{OrderError, SystemConfig};
use crate::clients::{AdminConsole, CatalogClient, OrderClient, ProfileClient, Storefront};
use crate::clock::{Clock, SystemClock};
use crate::domain::Session;
use crate::store::{StoreActor, StoreClient};

/// The main application system that owns the store actors.
///
/// Responsible for starting the document and profile stores, wiring the
/// clients on top of them, and handling shutdown.
pub struct OrderSystem {
    pub order_client: OrderClient,
    pub catalog_client: CatalogClient,
    pub profile_client: ProfileClient,
    documents: StoreClient,
    profiles: StoreClient,
    config: SystemConfig,
    handles: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    pub fn new(config: SystemConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SystemConfig, clock: Arc<dyn Clock>) -> Self {
        // 1. Document store: customers, orders, catalog
        let (document_actor, documents) = StoreActor::new("documents", config.store_buffer);
        let document_handle = tokio::spawn(document_actor.run());

        // 2. Key-value store: user profiles
        let (profile_actor, profiles) = StoreActor::new("profiles", config.store_buffer);
        let profile_handle = tokio::spawn(profile_actor.run());

        // 3. Clients
        let catalog_client = CatalogClient::new(documents.clone(), clock.clone(), config.max_update_attempts);
        let order_client = OrderClient::new(
            documents.clone(),
            catalog_client.clone(),
            clock,
            config.max_update_attempts,
        );
        let profile_client = ProfileClient::new(profiles.clone());

        info!(
            policy = ?config.line_policy,
            max_update_attempts = config.max_update_attempts,
            "Order system started"
        );

        Self {
            order_client,
            catalog_client,
            profile_client,
            documents,
            profiles,
            config,
            handles: vec![document_handle, profile_handle],
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Raw access to the document store, for hosts and tests.
    pub fn document_store(&self) -> &StoreClient {
        &self.documents
    }

    /// Resolves `owner_id` against the profile store.
    pub async fn login(&self, owner_id: &str) -> Result<Session, OrderError> {
        self.profile_client.resolve_session(owner_id).await
    }

    pub fn storefront(&self, session: Session) -> Storefront {
        Storefront::new(session, self.order_client.clone(), self.catalog_client.clone())
    }

    /// Fails with `Unauthorized` unless `session` is an admin.
    pub fn admin_console(&self, session: Session) -> Result<AdminConsole, OrderError> {
        AdminConsole::new(
            session,
            self.order_client.clone(),
            self.catalog_client.clone(),
            self.profile_client.clone(),
            self.config.line_policy,
            self.config.recent_orders_limit,
        )
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        for store in [&self.documents, &self.profiles] {
            if let Err(e) = store.shutdown().await {
                error!(error = %e, "Store already stopped");
            }
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(format!("Store task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use super::config::Settings;
use super::error::SystemError;
use crate::cart_actor::CartService;
use crate::clients::CartClient;
use crate::stock::{CatalogSource, HttpStockClient, InMemoryStock, StockQuery};

/// Owns the running actors and hands out their clients.
///
/// **Startup order:** the stock backend first, then the cart service with the
/// backend injected. **Shutdown order:** the cart service first, then the
/// backend once nothing references it any more.
pub struct CartSystem {
    pub cart_client: CartClient,
    pub catalog: Arc<dyn CatalogSource>,
    /// Present when no stock service URL is configured.
    pub inventory: Option<InMemoryStock>,
    handles: Vec<JoinHandle<()>>,
}

impl CartSystem {
    #[instrument(name = "cart_system", skip_all)]
    pub fn start(settings: &Settings) -> Result<Self, SystemError> {
        match &settings.stock_api_url {
            Some(url) => {
                // The stock check applies `query_timeout` itself, so the HTTP
                // client gets no competing timer.
                let http = Arc::new(HttpStockClient::new(url, None)?);
                info!(stock_api_url = %http.base_url(), "Using remote stock service");
                let stock: Arc<dyn StockQuery> = http.clone();
                Ok(Self::with_backend(settings, stock, http))
            }
            None => {
                let (inventory, handle) = InMemoryStock::spawn(settings.mailbox_size());
                info!("Using in-memory inventory");
                let backend = Arc::new(inventory.clone());
                let stock: Arc<dyn StockQuery> = backend.clone();
                let mut system = Self::with_backend(settings, stock, backend);
                system.inventory = Some(inventory);
                system.handles.push(handle);
                Ok(system)
            }
        }
    }

    /// Starts the cart service against injected collaborators.
    pub fn with_backend(
        settings: &Settings,
        stock: Arc<dyn StockQuery>,
        catalog: Arc<dyn CatalogSource>,
    ) -> Self {
        let (service, cart_client) =
            CartService::new(settings.mailbox_size(), stock, settings.check_settings());
        let handle = tokio::spawn(service.run());
        info!("Cart system started");

        Self {
            cart_client,
            catalog,
            inventory: None,
            handles: vec![handle],
        }
    }

    #[instrument(skip(self))]
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down cart system");

        if let Err(e) = self.cart_client.shutdown().await {
            error!(error = %e, "Cart service already stopped");
        }

        // Dropping the last inventory clients closes the inventory actor.
        drop(self.cart_client);
        drop(self.catalog);
        drop(self.inventory);

        let mut first_failure = None;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Actor task failed");
                first_failure.get_or_insert_with(|| SystemError::TaskFailed(e.to_string()));
            }
        }
        if let Some(failure) = first_failure {
            return Err(failure);
        }

        info!("Cart system shutdown complete");
        Ok(())
    }
}

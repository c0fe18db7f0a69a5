use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{CatalogSource, QueryError, StockLevel, StockQuery};
use crate::actor_framework::{Entity, FrameworkError, ResourceActor, ResourceClient};
use crate::domain::{Product, ProductId};

/// A catalog product together with its on-hand stock.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub product: Product,
    pub quantity: u32,
}

/// Payload for adding a product to the inventory.
#[derive(Debug, Clone)]
pub struct InventoryCreate {
    pub title: String,
    pub price: f64,
    pub quantity: u32,
}

impl InventoryCreate {
    pub fn new(title: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            title: title.into(),
            price,
            quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InventoryAction {
    /// Reads the stock level without modifying it.
    CheckStock,
    /// Adds units to the stock level.
    Restock(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InventoryActionResult {
    StockLevel(u32),
}

impl Entity for InventoryItem {
    type Id = ProductId;
    type CreatePayload = InventoryCreate;
    type Action = InventoryAction;
    type ActionResult = InventoryActionResult;

    fn id(&self) -> &ProductId {
        &self.product.id
    }

    fn from_create(id: ProductId, payload: InventoryCreate) -> Result<Self, String> {
        if payload.title.trim().is_empty() {
            return Err("Product title required".to_string());
        }
        if !payload.price.is_finite() || payload.price < 0.0 {
            return Err(format!("Invalid price: {}", payload.price));
        }
        Ok(Self {
            product: Product::new(id, payload.title, payload.price),
            quantity: payload.quantity,
        })
    }

    fn handle_action(&mut self, action: InventoryAction) -> Result<InventoryActionResult, String> {
        match action {
            InventoryAction::CheckStock => Ok(InventoryActionResult::StockLevel(self.quantity)),
            InventoryAction::Restock(amount) => {
                self.quantity = self
                    .quantity
                    .checked_add(amount)
                    .ok_or_else(|| format!("Restock of {} overflows stock level", amount))?;
                Ok(InventoryActionResult::StockLevel(self.quantity))
            }
        }
    }
}

/// In-process stand-in for the remote stock service, backed by a
/// [`ResourceActor`] of [`InventoryItem`]s.
#[derive(Clone)]
pub struct InMemoryStock {
    inner: ResourceClient<InventoryItem>,
}

impl InMemoryStock {
    pub fn new(inner: ResourceClient<InventoryItem>) -> Self {
        Self { inner }
    }

    /// Starts an inventory actor whose product ids count up from 1.
    pub fn spawn(buffer_size: usize) -> (Self, tokio::task::JoinHandle<()>) {
        let id_counter = Arc::new(AtomicU64::new(1));
        let next_product_id = move || ProductId(id_counter.fetch_add(1, Ordering::SeqCst));

        let (actor, client) = ResourceActor::<InventoryItem>::new(buffer_size, next_product_id);
        let handle = tokio::spawn(actor.run());
        (Self::new(client), handle)
    }

    #[instrument(skip(self))]
    pub async fn add_product(&self, item: InventoryCreate) -> Result<ProductId, QueryError> {
        let id = self.inner.create(item).await.map_err(|e| to_query_error(e, None))?;
        info!(product_id = %id, "Product stocked");
        Ok(id)
    }

    /// Stocks every item in order and returns the generated ids.
    pub async fn seed(&self, items: Vec<InventoryCreate>) -> Result<Vec<ProductId>, QueryError> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(self.add_product(item).await?);
        }
        Ok(ids)
    }

    #[instrument(skip(self))]
    pub async fn restock(&self, product_id: ProductId, amount: u32) -> Result<u32, QueryError> {
        match self
            .inner
            .perform_action(product_id, InventoryAction::Restock(amount))
            .await
        {
            Ok(InventoryActionResult::StockLevel(level)) => {
                info!(stock = level, "Product restocked");
                Ok(level)
            }
            Err(e) => Err(to_query_error(e, Some(product_id))),
        }
    }
}

fn to_query_error(error: FrameworkError, product_id: Option<ProductId>) -> QueryError {
    match (error, product_id) {
        (FrameworkError::NotFound(_), Some(id)) => QueryError::NotFound(id),
        (FrameworkError::Rejected(reason), _) => QueryError::Rejected(reason),
        (e, _) => QueryError::ActorCommunicationError(e.to_string()),
    }
}

#[async_trait]
impl StockQuery for InMemoryStock {
    #[instrument(skip(self))]
    async fn get_stock(&self, product_id: ProductId) -> Result<StockLevel, QueryError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(product_id, InventoryAction::CheckStock)
            .await
        {
            Ok(InventoryActionResult::StockLevel(quantity)) => Ok(StockLevel {
                id: product_id,
                quantity,
            }),
            Err(e) => Err(to_query_error(e, Some(product_id))),
        }
    }
}

#[async_trait]
impl CatalogSource for InMemoryStock {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, QueryError> {
        debug!("Sending request");
        let items = self.inner.list().await.map_err(|e| to_query_error(e, None))?;
        Ok(items.into_iter().map(|item| item.product).collect())
    }
}

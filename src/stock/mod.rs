//! Remote collaborators: the stock service consulted before every add, and the
//! catalog listing used to populate the storefront.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Product, ProductId};

pub mod error;
pub mod http;
pub mod memory;

pub use error::*;
pub use http::HttpStockClient;
pub use memory::*;

/// Stock payload as served by `stock/<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: ProductId,
    pub quantity: u32,
}

#[async_trait]
pub trait StockQuery: Send + Sync {
    async fn get_stock(&self, product_id: ProductId) -> Result<StockLevel, QueryError>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, QueryError>;
}

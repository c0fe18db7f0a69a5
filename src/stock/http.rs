use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{CatalogSource, QueryError, StockLevel, StockQuery};
use crate::domain::{Product, ProductId};

/// HTTP client for the stock service.
///
/// Serves `GET {base}/stock/{id}` and `GET {base}/products`. Any transport
/// failure, non-success status or undecodable body resolves to a [`QueryError`].
#[derive(Clone)]
pub struct HttpStockClient {
    http: Client,
    base_url: Url,
}

impl HttpStockClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, QueryError> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)
            .map_err(|e| QueryError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, QueryError> {
        self.base_url
            .join(path)
            .map_err(|e| QueryError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, QueryError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Sending request");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| QueryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl StockQuery for HttpStockClient {
    #[instrument(skip(self))]
    async fn get_stock(&self, product_id: ProductId) -> Result<StockLevel, QueryError> {
        let level: StockLevel = self.fetch_json(&format!("stock/{product_id}")).await?;
        if level.id != product_id {
            return Err(QueryError::Malformed(format!(
                "stock payload for product {} while querying {}",
                level.id, product_id
            )));
        }
        debug!(quantity = level.quantity, "Stock level received");
        Ok(level)
    }
}

#[async_trait]
impl CatalogSource for HttpStockClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, QueryError> {
        let products: Vec<Product> = self.fetch_json("products").await?;
        debug!(product_count = products.len(), "Catalog received");
        Ok(products)
    }
}

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::ProductId;
use crate::stock::{QueryError, StockLevel, StockQuery};

/// Outcome of comparing remote stock against the units already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecision {
    Commit,
    InsufficientStock { available: u32, held: u32 },
}

/// A product is addable only while strictly more units are available than
/// the cart already holds.
pub fn decide(available: u32, held: u32) -> StockDecision {
    if available > held {
        StockDecision::Commit
    } else {
        StockDecision::InsufficientStock { available, held }
    }
}

/// What a failed stock query does to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailurePolicy {
    /// Flag the product in the query-error set; the out-of-stock set and the
    /// cart lines stay untouched.
    #[default]
    RecordError,
    /// Record the product as out of stock.
    TreatAsOutOfStock,
}

impl FromStr for QueryFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "record_error" => Ok(Self::RecordError),
            "treat_as_out_of_stock" => Ok(Self::TreatAsOutOfStock),
            other => Err(format!("Unknown query failure policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckSettings {
    /// Upper bound on a single stock query. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
    pub on_query_failure: QueryFailurePolicy,
}

pub(crate) async fn query_stock(
    stock: &dyn StockQuery,
    product_id: ProductId,
    timeout: Option<Duration>,
) -> Result<StockLevel, QueryError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, stock.get_stock(product_id))
            .await
            .map_err(|_| QueryError::Timeout(limit))?,
        None => stock.get_stock(product_id).await,
    }
}

use tokio::sync::oneshot;

use super::error::CartError;
use crate::domain::{Product, ProductId};
use crate::stock::{QueryError, StockLevel};

pub type ServiceResponse<T> = oneshot::Sender<Result<T, CartError>>;

/// Acknowledges that an add request was dispatched. The outcome shows up
/// later in the published cart state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddTicket {
    pub product_id: ProductId,
    pub generation: u64,
}

#[derive(Debug)]
pub enum CartRequest {
    RequestAdd {
        product: Product,
        respond_to: ServiceResponse<AddTicket>,
    },
    CurrentQuantity {
        product_id: ProductId,
        respond_to: ServiceResponse<u32>,
    },
    PendingChecks {
        respond_to: ServiceResponse<usize>,
    },
    Shutdown,
    #[cfg(test)]
    DiscardedCount {
        respond_to: ServiceResponse<usize>,
    },
}

/// Result of a spawned stock query, routed back into the service loop.
#[derive(Debug)]
pub(crate) struct StockCheckCompletion {
    pub product: Product,
    pub generation: u64,
    pub held: u32,
    pub result: Result<StockLevel, QueryError>,
}

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument};

use crate::cart_actor::{AddTicket, CartError, CartRequest};
use crate::domain::{CartLine, CartState, Product, ProductId};

/// Handle to the cart service.
///
/// `request_add` is fire-and-forget: it returns once the stock check is
/// dispatched. Outcomes are observed through the published cart state, either
/// with the synchronous snapshot readers or by awaiting [`subscribe`].
///
/// [`subscribe`]: CartClient::subscribe
#[derive(Clone)]
pub struct CartClient {
    sender: mpsc::Sender<CartRequest>,
    state: watch::Receiver<CartState>,
}

impl CartClient {
    pub(crate) fn new(sender: mpsc::Sender<CartRequest>, state: watch::Receiver<CartState>) -> Self {
        Self { sender, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn cart_lines(&self) -> Vec<CartLine> {
        self.state.borrow().lines().to_vec()
    }

    pub fn failed_product_ids(&self) -> Vec<ProductId> {
        self.state.borrow().failed_product_ids()
    }

    pub fn query_error_product_ids(&self) -> Vec<ProductId> {
        self.state.borrow().query_error_product_ids()
    }

    pub fn item_count(&self) -> usize {
        self.state.borrow().item_count()
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), CartError> {
        debug!("Sending shutdown");
        self.sender
            .send(CartRequest::Shutdown)
            .await
            .map_err(|_| CartError::ActorCommunicationError("Actor closed".to_string()))
    }

    /// Polls until no stock check is in flight, or `limit` elapses.
    pub async fn wait_idle(&self, poll: Duration, limit: Duration) -> Result<(), CartError> {
        let idle = async {
            loop {
                if self.pending_checks().await? == 0 {
                    return Ok::<(), CartError>(());
                }
                tokio::time::sleep(poll).await;
            }
        };
        tokio::time::timeout(limit, idle)
            .await
            .map_err(|_| CartError::StillPending(limit))?
    }
}

client_method!(CartClient => fn request_add(product: Product) -> AddTicket as CartRequest::RequestAdd, Error = CartError);
client_method!(CartClient => fn current_quantity(product_id: ProductId) -> u32 as CartRequest::CurrentQuantity, Error = CartError);
client_method!(CartClient => fn pending_checks() -> usize as CartRequest::PendingChecks, Error = CartError);
#[cfg(test)]
client_method!(CartClient => fn discarded_count() -> usize as CartRequest::DiscardedCount, Error = CartError);

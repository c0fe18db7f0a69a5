//! # Mock Framework
//!
//! Utilities for testing clients and services in isolation.
//!
//! Use [`create_mock_client`] to get a resource client and a receiver, then
//! helpers like [`expect_action`] to assert what the client sent. Use
//! [`create_mock_stock`] to get a stock collaborator whose queries stay pending
//! until the test answers them, in whatever order the test chooses.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};
use crate::domain::ProductId;
use crate::stock::{QueryError, StockLevel, StockQuery};

/// Creates a mock client and a receiver for asserting requests.
pub fn create_mock_client<T: Entity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<oneshot::Sender<Result<Vec<T>, FrameworkError>>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// A stock query the test has not answered yet.
#[derive(Debug)]
pub struct PendingStockQuery {
    pub product_id: ProductId,
    pub respond_to: oneshot::Sender<Result<StockLevel, QueryError>>,
}

impl PendingStockQuery {
    pub fn reply(self, quantity: u32) {
        let level = StockLevel {
            id: self.product_id,
            quantity,
        };
        let _ = self.respond_to.send(Ok(level));
    }

    pub fn fail(self, error: QueryError) {
        let _ = self.respond_to.send(Err(error));
    }
}

#[derive(Clone)]
pub struct MockStock {
    queries: mpsc::UnboundedSender<PendingStockQuery>,
}

#[async_trait]
impl StockQuery for MockStock {
    async fn get_stock(&self, product_id: ProductId) -> Result<StockLevel, QueryError> {
        let (respond_to, response) = oneshot::channel();
        self.queries
            .send(PendingStockQuery {
                product_id,
                respond_to,
            })
            .map_err(|_| QueryError::ActorCommunicationError("Mock closed".to_string()))?;
        response
            .await
            .map_err(|_| QueryError::ActorCommunicationError("Mock dropped".to_string()))?
    }
}

pub fn create_mock_stock() -> (MockStock, mpsc::UnboundedReceiver<PendingStockQuery>) {
    let (queries, receiver) = mpsc::unbounded_channel();
    (MockStock { queries }, receiver)
}

/// Helper to wait for the next stock query issued against a [`MockStock`]
pub async fn expect_stock_query(
    receiver: &mut mpsc::UnboundedReceiver<PendingStockQuery>,
) -> Option<PendingStockQuery> {
    tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv())
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_stock_answers_out_of_order() {
        let (stock, mut queries) = create_mock_stock();

        let first = tokio::spawn({
            let stock = stock.clone();
            async move { stock.get_stock(ProductId(1)).await }
        });
        let pending_first = expect_stock_query(&mut queries).await.expect("first query");

        let second = tokio::spawn(async move { stock.get_stock(ProductId(2)).await });
        let pending_second = expect_stock_query(&mut queries).await.expect("second query");

        pending_second.reply(7);
        pending_first.fail(QueryError::Transport("reset".to_string()));

        assert_eq!(
            second.await.unwrap(),
            Ok(StockLevel { id: ProductId(2), quantity: 7 })
        );
        assert_eq!(
            first.await.unwrap(),
            Err(QueryError::Transport("reset".to_string()))
        );
    }
}

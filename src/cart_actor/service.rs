use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::check::{decide, query_stock, CheckSettings, QueryFailurePolicy, StockDecision};
use super::messages::{AddTicket, CartRequest, ServiceResponse, StockCheckCompletion};
use super::supersession::Generations;
use crate::clients::CartClient;
use crate::domain::{CartState, Product, ProductId};
use crate::stock::StockQuery;

enum Event {
    Request(Option<CartRequest>),
    StockChecked(StockCheckCompletion),
}

/// Owns the cart and runs the stock-check workflow.
///
/// All reads and writes of [`CartState`] happen on this actor's loop, so no
/// caller ever observes a half-applied change. Stock queries run on their own
/// tasks and report back through `completions`; the loop applies a result only
/// if it belongs to the latest request for that product.
pub struct CartService {
    receiver: mpsc::Receiver<CartRequest>,
    completions_tx: mpsc::UnboundedSender<StockCheckCompletion>,
    completions: mpsc::UnboundedReceiver<StockCheckCompletion>,
    state: CartState,
    state_tx: watch::Sender<CartState>,
    generations: Generations,
    stock: Arc<dyn StockQuery>,
    settings: CheckSettings,
    in_flight: usize,
    discarded: usize,
}

impl CartService {
    pub fn new(
        buffer_size: usize,
        stock: Arc<dyn StockQuery>,
        settings: CheckSettings,
    ) -> (Self, CartClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CartState::new());
        let service = Self {
            receiver,
            completions_tx,
            completions,
            state: CartState::new(),
            state_tx,
            generations: Generations::default(),
            stock,
            settings,
            in_flight: 0,
            discarded: 0,
        };
        let client = CartClient::new(sender, state_rx);
        (service, client)
    }

    #[instrument(name = "cart_service", skip(self))]
    pub async fn run(mut self) {
        info!("CartService starting");

        loop {
            let event = tokio::select! {
                msg = self.receiver.recv() => Event::Request(msg),
                Some(done) = self.completions.recv() => Event::StockChecked(done),
            };

            match event {
                Event::Request(Some(CartRequest::Shutdown)) | Event::Request(None) => {
                    info!(pending = self.in_flight, "CartService shutting down");
                    break;
                }
                Event::Request(Some(msg)) => self.handle_request(msg),
                Event::StockChecked(done) => self.handle_stock_checked(done),
            }
        }

        info!("CartService stopped");
    }

    fn handle_request(&mut self, msg: CartRequest) {
        match msg {
            CartRequest::RequestAdd {
                product,
                respond_to,
            } => {
                self.handle_request_add(product, respond_to);
            }
            CartRequest::CurrentQuantity {
                product_id,
                respond_to,
            } => {
                let _ = respond_to.send(Ok(self.state.current_quantity(product_id)));
            }
            CartRequest::PendingChecks { respond_to } => {
                let _ = respond_to.send(Ok(self.in_flight));
            }
            CartRequest::Shutdown => {}
            #[cfg(test)]
            CartRequest::DiscardedCount { respond_to } => {
                let _ = respond_to.send(Ok(self.discarded));
            }
        }
    }

    /// Snapshots the held quantity, stamps a generation and starts the stock
    /// query. Replies as soon as the check is dispatched.
    #[instrument(fields(product_id = %product.id), skip(self, product, respond_to))]
    fn handle_request_add(&mut self, product: Product, respond_to: ServiceResponse<AddTicket>) {
        let held = self.state.current_quantity(product.id);
        let generation = self.generations.stamp(product.id);
        self.in_flight += 1;
        debug!(held, generation, "Stock check dispatched");

        let _ = respond_to.send(Ok(AddTicket {
            product_id: product.id,
            generation,
        }));

        let stock = Arc::clone(&self.stock);
        let completions = self.completions_tx.clone();
        let timeout = self.settings.query_timeout;
        tokio::spawn(
            async move {
                let result = query_stock(stock.as_ref(), product.id, timeout).await;
                let _ = completions.send(StockCheckCompletion {
                    product,
                    generation,
                    held,
                    result,
                });
            }
            .in_current_span(),
        );
    }

    #[instrument(
        fields(product_id = %done.product.id, generation = done.generation),
        skip(self, done)
    )]
    fn handle_stock_checked(&mut self, done: StockCheckCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let product_id = done.product.id;

        if !self.generations.is_latest(product_id, done.generation) {
            self.discarded += 1;
            debug!("Discarding superseded stock check");
            return;
        }

        match done.result {
            Ok(level) => match decide(level.quantity, done.held) {
                StockDecision::Commit => {
                    let quantity = self.state.commit_increment(&done.product);
                    info!(quantity, available = level.quantity, "Product added to cart");
                }
                StockDecision::InsufficientStock { available, held } => {
                    self.state.record_failure(product_id);
                    warn!(available, held, "Insufficient stock");
                }
            },
            Err(e) => {
                error!(error = %e, "Stock query failed");
                self.apply_query_failure(product_id);
            }
        }

        self.publish();
    }

    fn apply_query_failure(&mut self, product_id: ProductId) {
        match self.settings.on_query_failure {
            QueryFailurePolicy::RecordError => {
                self.state.record_query_error(product_id);
            }
            QueryFailurePolicy::TreatAsOutOfStock => {
                self.state.record_failure(product_id);
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::{create_mock_stock, expect_stock_query, PendingStockQuery};
    use crate::stock::QueryError;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn widget() -> Product {
        Product::new(1, "Widget", 10.0)
    }

    fn gadget() -> Product {
        Product::new(2, "Gadget", 25.0)
    }

    fn start(settings: CheckSettings) -> (CartClient, UnboundedReceiver<PendingStockQuery>) {
        let (stock, queries) = create_mock_stock();
        let (service, client) = CartService::new(10, Arc::new(stock), settings);
        tokio::spawn(service.run());
        (client, queries)
    }

    async fn settle(client: &CartClient) {
        client
            .wait_idle(Duration::from_millis(2), Duration::from_secs(1))
            .await
            .expect("cart service did not settle");
    }

    /// Dispatches an add, answers its query with `available`, and waits for it.
    async fn add_with_stock(
        client: &CartClient,
        queries: &mut UnboundedReceiver<PendingStockQuery>,
        product: Product,
        available: u32,
    ) {
        client.request_add(product).await.unwrap();
        expect_stock_query(queries).await.expect("stock query").reply(available);
        settle(client).await;
    }

    #[tokio::test]
    async fn test_first_add_commits_single_line() {
        let (client, mut queries) = start(CheckSettings::default());

        add_with_stock(&client, &mut queries, widget(), 5).await;

        let lines = client.cart_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product.id, ProductId(1));
        assert_eq!(lines[0].quantity, 1);
        assert!(client.failed_product_ids().is_empty());
    }

    #[tokio::test]
    async fn test_re_add_increments_when_stock_exceeds_held() {
        let (client, mut queries) = start(CheckSettings::default());
        add_with_stock(&client, &mut queries, widget(), 5).await;
        add_with_stock(&client, &mut queries, widget(), 5).await;
        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(2));

        add_with_stock(&client, &mut queries, widget(), 5).await;

        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(3));
        assert_eq!(client.item_count(), 1);
    }

    #[tokio::test]
    async fn test_equal_stock_records_failure() {
        let (client, mut queries) = start(CheckSettings::default());
        for _ in 0..3 {
            add_with_stock(&client, &mut queries, widget(), 3).await;
        }

        add_with_stock(&client, &mut queries, widget(), 3).await;

        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(3));
        assert_eq!(client.failed_product_ids(), vec![ProductId(1)]);
    }

    #[tokio::test]
    async fn test_later_success_clears_failure() {
        let (client, mut queries) = start(CheckSettings::default());
        add_with_stock(&client, &mut queries, widget(), 0).await;
        assert_eq!(client.failed_product_ids(), vec![ProductId(1)]);
        assert!(client.cart_lines().is_empty());

        add_with_stock(&client, &mut queries, widget(), 4).await;

        assert!(client.failed_product_ids().is_empty());
        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(1));
    }

    #[tokio::test]
    async fn test_distinct_products_resolve_independently() {
        let (client, mut queries) = start(CheckSettings::default());

        client.request_add(widget()).await.unwrap();
        let widget_query = expect_stock_query(&mut queries).await.unwrap();
        client.request_add(gadget()).await.unwrap();
        let gadget_query = expect_stock_query(&mut queries).await.unwrap();
        assert_eq!(widget_query.product_id, ProductId(1));
        assert_eq!(gadget_query.product_id, ProductId(2));

        gadget_query.reply(0);
        widget_query.reply(2);
        settle(&client).await;

        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(1));
        assert_eq!(client.current_quantity(ProductId(2)).await, Ok(0));
        assert_eq!(client.failed_product_ids(), vec![ProductId(2)]);
        assert_eq!(client.discarded_count().await, Ok(0));
    }

    #[tokio::test]
    async fn test_latest_request_wins_when_stale_result_arrives_last() {
        let (client, mut queries) = start(CheckSettings::default());

        let first_ticket = client.request_add(widget()).await.unwrap();
        let first = expect_stock_query(&mut queries).await.unwrap();
        let second_ticket = client.request_add(widget()).await.unwrap();
        let second = expect_stock_query(&mut queries).await.unwrap();
        assert!(second_ticket.generation > first_ticket.generation);

        second.reply(0);
        first.reply(5);
        settle(&client).await;

        assert!(client.cart_lines().is_empty());
        assert_eq!(client.failed_product_ids(), vec![ProductId(1)]);
        assert_eq!(client.discarded_count().await, Ok(1));
    }

    #[tokio::test]
    async fn test_latest_request_wins_when_stale_result_arrives_first() {
        let (client, mut queries) = start(CheckSettings::default());

        client.request_add(widget()).await.unwrap();
        let first = expect_stock_query(&mut queries).await.unwrap();
        client.request_add(widget()).await.unwrap();
        let second = expect_stock_query(&mut queries).await.unwrap();

        first.reply(0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.failed_product_ids().is_empty());

        second.reply(5);
        settle(&client).await;

        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(1));
        assert!(client.failed_product_ids().is_empty());
        assert_eq!(client.discarded_count().await, Ok(1));
    }

    #[tokio::test]
    async fn test_query_failure_is_recorded_apart_from_out_of_stock() {
        let (client, mut queries) = start(CheckSettings::default());
        add_with_stock(&client, &mut queries, widget(), 5).await;

        client.request_add(widget()).await.unwrap();
        expect_stock_query(&mut queries)
            .await
            .unwrap()
            .fail(QueryError::Transport("connection reset".to_string()));
        settle(&client).await;

        assert_eq!(client.query_error_product_ids(), vec![ProductId(1)]);
        assert!(client.failed_product_ids().is_empty());
        assert_eq!(client.current_quantity(ProductId(1)).await, Ok(1));
    }

    #[tokio::test]
    async fn test_conservative_policy_treats_failure_as_out_of_stock() {
        let (client, mut queries) = start(CheckSettings {
            query_timeout: None,
            on_query_failure: QueryFailurePolicy::TreatAsOutOfStock,
        });

        client.request_add(widget()).await.unwrap();
        expect_stock_query(&mut queries).await.unwrap().fail(QueryError::Status {
            status: 503,
            url: "http://stock/stock/1".to_string(),
        });
        settle(&client).await;

        assert_eq!(client.failed_product_ids(), vec![ProductId(1)]);
        assert!(client.query_error_product_ids().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_resolves_as_query_failure() {
        let (client, mut queries) = start(CheckSettings {
            query_timeout: Some(Duration::from_millis(20)),
            on_query_failure: QueryFailurePolicy::RecordError,
        });

        client.request_add(widget()).await.unwrap();
        let _unanswered = expect_stock_query(&mut queries).await.unwrap();
        settle(&client).await;

        assert_eq!(client.query_error_product_ids(), vec![ProductId(1)]);
        assert!(client.cart_lines().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_state() {
        let (client, mut queries) = start(CheckSettings::default());
        let mut updates = client.subscribe();

        client.request_add(widget()).await.unwrap();
        expect_stock_query(&mut queries).await.unwrap().reply(1);

        tokio::time::timeout(Duration::from_secs(1), updates.changed())
            .await
            .expect("no update published")
            .unwrap();
        assert_eq!(updates.borrow().current_quantity(ProductId(1)), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_service() {
        let (stock, _queries) = create_mock_stock();
        let (service, client) = CartService::new(10, Arc::new(stock), CheckSettings::default());
        let handle = tokio::spawn(service.run());

        client.shutdown().await.unwrap();
        handle.await.unwrap();

        assert!(matches!(
            client.pending_checks().await,
            Err(crate::cart_actor::CartError::ActorCommunicationError(_))
        ));
    }
}

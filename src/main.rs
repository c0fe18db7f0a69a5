use std::time::Duration;

use tracing::{info, warn, Instrument};

use stock_cart::app_system::{load_settings, setup_tracing, CartSystem, SystemError};
use stock_cart::domain::Product;
use stock_cart::stock::InventoryCreate;

#[tokio::main]
async fn main() -> Result<(), SystemError> {
    setup_tracing();

    let settings = load_settings();
    info!(?settings, "Starting cart demo");

    let system = CartSystem::start(&settings)?;

    if let Some(inventory) = &system.inventory {
        inventory
            .seed(vec![
                InventoryCreate::new("Widget", 10.0, 5),
                InventoryCreate::new("Gadget", 25.0, 1),
                InventoryCreate::new("Gizmo", 7.5, 0),
            ])
            .await?;
    }

    let catalog = system.catalog.list_products().await?;
    info!(product_count = catalog.len(), "Catalog loaded");

    let span = tracing::info_span!("shopping");
    async {
        for product in &catalog {
            system.cart_client.request_add(product.clone()).await?;
        }

        // A double click: only the second request's outcome counts.
        if let Some(first) = catalog.first() {
            system.cart_client.request_add(first.clone()).await?;
            system.cart_client.request_add(first.clone()).await?;
        }

        system
            .cart_client
            .wait_idle(Duration::from_millis(10), Duration::from_secs(10))
            .await?;
        render(&system, &catalog);
        Ok::<(), SystemError>(())
    }
    .instrument(span)
    .await?;

    if let (Some(inventory), Some(last)) = (&system.inventory, catalog.last()) {
        let span = tracing::info_span!("restock");
        async {
            inventory.restock(last.id, 3).await?;
            system.cart_client.request_add(last.clone()).await?;
            system
                .cart_client
                .wait_idle(Duration::from_millis(10), Duration::from_secs(10))
                .await?;
            render(&system, &catalog);
            Ok::<(), SystemError>(())
        }
        .instrument(span)
        .await?;
    }

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}

fn render(system: &CartSystem, catalog: &[Product]) {
    let cart = system.cart_client.snapshot();
    info!(items = cart.item_count(), "Products on cart");

    for product in catalog {
        let quantity = cart.current_quantity(product.id);
        if cart.has_failed_stock_check(product.id) {
            warn!(product = %product.title, quantity, "Out of stock");
        } else if cart.query_error_product_ids().contains(&product.id) {
            warn!(product = %product.title, quantity, "Stock unknown");
        } else {
            info!(product = %product.title, price = product.price, quantity, "In cart");
        }
    }
}

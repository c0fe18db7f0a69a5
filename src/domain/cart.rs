use std::collections::BTreeSet;

use super::product::{Product, ProductId};

/// A product held in the cart together with how many units were committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

/// The shopping cart.
///
/// Lines keep the order in which each product was first added. A product id
/// sits in the failed set after its latest stock check came back short, and in
/// the query-error set after its latest stock query could not be completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    lines: Vec<CartLine>,
    failed_stock_check: BTreeSet<ProductId>,
    stock_query_errors: BTreeSet<ProductId>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units of `product_id` currently held, or 0 when absent.
    pub fn current_quantity(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product.id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Adds one unit of `product`, appending a new line on first add.
    ///
    /// Returns the quantity now held. Clears any earlier failure recorded for
    /// the product.
    pub fn commit_increment(&mut self, product: &Product) -> u32 {
        self.failed_stock_check.remove(&product.id);
        self.stock_query_errors.remove(&product.id);

        match self.lines.iter_mut().find(|line| line.product.id == product.id) {
            Some(line) => {
                line.quantity += 1;
                line.quantity
            }
            None => {
                self.lines.push(CartLine {
                    product: product.clone(),
                    quantity: 1,
                });
                1
            }
        }
    }

    /// Flags `product_id` as out of stock. Idempotent; returns `true` if the
    /// flag was not already set.
    pub fn record_failure(&mut self, product_id: ProductId) -> bool {
        self.stock_query_errors.remove(&product_id);
        self.failed_stock_check.insert(product_id)
    }

    /// Flags `product_id` as having an unknown stock level because the query
    /// itself failed. Idempotent.
    pub fn record_query_error(&mut self, product_id: ProductId) -> bool {
        self.stock_query_errors.insert(product_id)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn failed_product_ids(&self) -> Vec<ProductId> {
        self.failed_stock_check.iter().copied().collect()
    }

    pub fn query_error_product_ids(&self) -> Vec<ProductId> {
        self.stock_query_errors.iter().copied().collect()
    }

    pub fn has_failed_stock_check(&self, product_id: ProductId) -> bool {
        self.failed_stock_check.contains(&product_id)
    }

    /// Number of distinct products in the cart.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }
}

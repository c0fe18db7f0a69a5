use std::collections::HashMap;

use crate::domain::ProductId;

/// Per-product invocation counter.
///
/// Every add request is stamped with the next generation for its product; a
/// stock-check result only applies if its stamp is still the latest one.
#[derive(Debug, Default)]
pub struct Generations {
    latest: HashMap<ProductId, u64>,
}

impl Generations {
    pub fn stamp(&mut self, product_id: ProductId) -> u64 {
        let generation = self.latest.entry(product_id).or_insert(0);
        *generation += 1;
        *generation
    }

    pub fn is_latest(&self, product_id: ProductId, generation: u64) -> bool {
        self.latest.get(&product_id) == Some(&generation)
    }
}

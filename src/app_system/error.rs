use thiserror::Error;

use crate::cart_actor::CartError;
use crate::stock::QueryError;

/// Errors raised while wiring, running, or shutting down the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Stock backend error: {0}")]
    Backend(#[from] QueryError),
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
    #[error("Actor task failed: {0}")]
    TaskFailed(String),
}

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the cart service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
    #[error("Stock checks still pending after {0:?}")]
    StillPending(Duration),
}

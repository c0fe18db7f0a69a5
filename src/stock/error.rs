use std::time::Duration;

use thiserror::Error;

use crate::domain::ProductId;

/// Errors raised by the remote stock and catalog collaborators.
///
/// Every variant means "the query failed". None of them means "insufficient
/// stock", which is a valid answer carried by a successful query.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Stock query timed out after {0:?}")]
    Timeout(Duration),
    #[error("Product not found: {0}")]
    NotFound(ProductId),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

//! The cart service: cart state plus the stock-check-then-commit workflow.

pub mod check;
pub mod error;
mod messages;
pub mod service;
mod supersession;

pub use check::*;
pub use error::*;
pub use messages::*;
pub use service::CartService;
pub use supersession::Generations;

//! System orchestration, configuration, startup, and shutdown logic.

pub mod cart_system;
pub mod config;
pub mod error;
pub mod telemetry;

pub use cart_system::*;
pub use config::*;
pub use error::*;
pub use telemetry::*;

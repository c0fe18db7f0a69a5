//! # Stock-checked shopping cart
//!
//! An add-to-cart workflow that consults a remote stock service before every
//! commit, built as a small actor system.
//!
//! ## Ingredients
//!
//! - **Domain types** - products, cart lines and the cart itself → [`domain`]
//! - **Cart service** - one actor owns [`CartState`](domain::CartState) and runs
//!   the stock-check workflow; the latest request per product wins → [`cart_actor`]
//! - **Client** - fire-and-forget `request_add` plus synchronous snapshot
//!   reads of the published state → [`CartClient`](clients::CartClient)
//! - **Stock collaborators** - HTTP stock service, or an in-memory inventory
//!   served by a generic resource actor → [`stock`], [`actor_framework`]
//! - **System concerns** - settings, tracing, startup and shutdown → [`app_system`]
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let system = CartSystem::start(&load_settings())?;
//! let catalog = system.catalog.list_products().await?;
//!
//! // Returns as soon as the stock check is dispatched
//! system.cart_client.request_add(catalog[0].clone()).await?;
//!
//! let mut updates = system.cart_client.subscribe();
//! updates.changed().await?;
//! println!("Products on cart: {}", updates.borrow().item_count());
//!
//! system.shutdown().await?;
//! ```

pub mod actor_framework;
pub mod app_system;
pub mod cart_actor;
pub mod clients;
pub mod domain;
pub mod stock;

#[cfg(test)]
mod mock_framework;

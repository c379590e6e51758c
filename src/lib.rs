//! Client-side data layer for a hosted-backend storefront.
//!
//! - [`catalog::CatalogStore`] caches categories and items behind a
//!   time-based staleness policy and answers derived lookups
//! - [`orders::OrderStore`] owns the signed-in user's orders and performs
//!   create, status update and cancellation writes
//! - [`gateway::Gateway`] is the remote contract both stores depend on
//!
//! Stores are constructed explicitly and shared by reference; see
//! [`app::Storefront`] for the usual wiring.

pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
mod loading;
pub mod orders;

pub use app::Storefront;
pub use error::{GatewayError, StoreError};

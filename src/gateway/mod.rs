//! The remote data gateway: the only boundary the stores talk across.
//!
//! - `Gateway` is the query/mutate contract the stores depend on
//! - `RestGateway` implements it against a PostgREST-style backend
//! - `api_types` holds the typed row schemas for both directions

pub mod api_types;
mod rest;

#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;

pub use rest::RestGateway;

use crate::error::GatewayError;
use api_types::{
  AuthUser, CancellationRequestRow, CategoryRow, ItemRow, NewOrderLineRow, NewOrderRow, OrderRow,
};

/// Storage bucket holding category images.
pub const CATEGORY_BUCKET: &str = "categories";
/// Storage bucket holding item images.
pub const ITEM_BUCKET: &str = "items";

/// Query/mutate interface to the remote catalog and order backend.
///
/// Every remote operation is asynchronous and may fail. Implementations
/// must be shareable across tasks since both stores hold the same gateway.
pub trait Gateway: Send + Sync {
  fn list_categories(&self) -> impl Future<Output = Result<Vec<CategoryRow>, GatewayError>> + Send;

  fn list_items(&self) -> impl Future<Output = Result<Vec<ItemRow>, GatewayError>> + Send;

  /// The signed-in user, or `None` when there is no session.
  fn current_user(&self) -> impl Future<Output = Result<Option<AuthUser>, GatewayError>> + Send;

  /// Orders for `user_id`, newest first, with line summaries only.
  fn list_orders(
    &self,
    user_id: &str,
  ) -> impl Future<Output = Result<Vec<OrderRow>, GatewayError>> + Send;

  /// One order with every line joined to its item.
  fn get_order(&self, id: &str) -> impl Future<Output = Result<OrderRow, GatewayError>> + Send;

  fn create_order(
    &self,
    order: &NewOrderRow,
  ) -> impl Future<Output = Result<(), GatewayError>> + Send;

  fn create_order_lines(
    &self,
    lines: &[NewOrderLineRow],
  ) -> impl Future<Output = Result<(), GatewayError>> + Send;

  fn update_order_status(
    &self,
    id: &str,
    status: &str,
  ) -> impl Future<Output = Result<(), GatewayError>> + Send;

  fn insert_cancellation_request(
    &self,
    request: &CancellationRequestRow,
  ) -> impl Future<Output = Result<(), GatewayError>> + Send;

  /// Compensating delete for an order header whose lines failed to write.
  fn delete_order(&self, id: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;

  /// Compensating delete for a cancellation request whose status update failed.
  fn delete_cancellation_request(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<(), GatewayError>> + Send;

  /// Turn a storage path into a fully-qualified public URL.
  fn resolve_storage_url(&self, bucket: &str, path: &str) -> String;
}

/// True if `path` is already an absolute http(s) URL.
pub fn is_absolute_url(path: &str) -> bool {
  path.starts_with("http://") || path.starts_with("https://")
}

//! Error types shared by the gateway and both stores.

use thiserror::Error;

/// Errors raised by a [`Gateway`](crate::gateway::Gateway) call.
///
/// Messages are captured as strings so the error can be cloned into store
/// state and handed to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  /// The request never produced a response (connect, timeout, TLS).
  #[error("HTTP error: {0}")]
  Http(String),

  /// The backend answered with a non-success status.
  #[error("Backend error ({status}): {message}")]
  Backend { status: u16, message: String },

  /// The response body did not match the expected row shape.
  #[error("Decode error: {0}")]
  Decode(String),

  /// The requested record does not exist.
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: String },
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::Decode(err.to_string())
    } else {
      Self::Http(err.to_string())
    }
  }
}

impl From<serde_json::Error> for GatewayError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

/// Errors surfaced by the catalog and order stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  /// An order operation was attempted without a signed-in user.
  #[error("User not authenticated")]
  AuthRequired,

  #[error(transparent)]
  Gateway(#[from] GatewayError),

  /// `cancel_order` was called with a blank reason.
  #[error("Cancellation reason must not be empty")]
  EmptyReason,

  /// A multi-step write failed half way and the compensating write failed
  /// too, leaving incomplete remote state behind.
  #[error("Order {order_id}: {step} failed and could not be rolled back: {source}")]
  PartialWrite {
    order_id: String,
    step: &'static str,
    source: GatewayError,
  },
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::Item;

/// Order lifecycle status.
///
/// Intended flow is `pending → shipped → delivered`, with `cancelled`
/// reachable from `pending` or `shipped`. None of this is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  #[default]
  Pending,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Wire value written to the backend.
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

/// Status string that matched none of the known spellings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  /// Case-insensitive, ignores surrounding whitespace, and accepts the
  /// US spelling "canceled".
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "pending" => Ok(OrderStatus::Pending),
      "shipped" => Ok(OrderStatus::Shipped),
      "delivered" => Ok(OrderStatus::Delivered),
      "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
      _ => Err(UnknownStatus(s.to_string())),
    }
  }
}

/// One item-quantity-price record of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
  pub item_id: i64,
  pub quantity: u32,
  pub price_at_purchase: Decimal,
  /// Joined item, only present on detail fetches
  pub item: Option<Item>,
}

/// Order as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: String,
  /// Short display form of the id
  pub slug: String,
  pub status: OrderStatus,
  /// Display-formatted creation date
  pub date: String,
  pub created_at: DateTime<Utc>,
  /// Line count summary, e.g. "2 items"
  pub item: String,
  /// Formatted total, e.g. "$19.98"
  pub details: String,
  pub total: Decimal,
  pub shipping_address: String,
  pub payment_method: String,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
  /// Empty on list fetches; populated by `OrderStore::get_order_by_id`
  pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderLine {
  pub item_id: i64,
  pub quantity: u32,
  pub price_at_purchase: Decimal,
}

/// Payload for `OrderStore::create_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
  pub items: Vec<NewOrderLine>,
  pub total_amount: Decimal,
  pub shipping_address: String,
  pub payment_method: String,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub status: OrderStatus,
}

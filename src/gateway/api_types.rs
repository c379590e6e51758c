//! Serde types matching the backend's table rows.
//!
//! These are kept separate from the domain types so the wire shape
//! (column names, nullable columns, nested joins) can change without
//! touching what the stores hand to callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Catalog rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
  pub id: i64,
  pub name: String,
  pub slug: String,
  /// Storage path or full URL, may be missing.
  #[serde(rename = "imageUrl", default)]
  pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
  pub id: i64,
  pub title: String,
  pub price: Decimal,
  #[serde(rename = "heroImage", default)]
  pub hero_image: Option<String>,
  pub category_id: i64,
  #[serde(default = "default_orderable")]
  pub orderable: bool,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(rename = "nutritionalInfo", default)]
  pub nutritional_info: Option<String>,
}

fn default_orderable() -> bool {
  true
}

// ============================================================================
// Order rows (read side)
// ============================================================================

/// An order row with its nested `order_items` join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
  pub id: String,
  pub status: String,
  pub total_amount: Decimal,
  #[serde(default)]
  pub shipping_address: Option<String>,
  #[serde(default)]
  pub payment_method: Option<String>,
  #[serde(default)]
  pub tracking_number: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub order_items: Vec<OrderLineRow>,
}

/// One `order_items` row. `items` is only present on the detail join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRow {
  #[serde(default)]
  pub id: Option<String>,
  pub item_id: i64,
  pub quantity: u32,
  pub price_at_purchase: Decimal,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub items: Option<ItemRow>,
}

// ============================================================================
// Write payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRow {
  pub id: String,
  pub user_id: String,
  pub status: String,
  pub total_amount: Decimal,
  pub shipping_address: String,
  pub payment_method: String,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderLineRow {
  pub id: String,
  pub order_id: String,
  pub item_id: i64,
  pub quantity: u32,
  pub price_at_purchase: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRequestRow {
  pub id: String,
  pub order_id: String,
  pub request_type: String,
  pub details: String,
  pub status: String,
}

// ============================================================================
// Auth
// ============================================================================

/// The signed-in user as reported by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
  pub id: String,
  #[serde(default)]
  pub email: Option<String>,
}

//! Mapping from backend order rows to display-ready orders.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use super::types::{Order, OrderLine, OrderStatus, UnknownStatus};
use crate::catalog::item_from_row;
use crate::gateway::api_types::{OrderLineRow, OrderRow};
use crate::gateway::Gateway;

/// Length of the short display id.
pub const SLUG_LEN: usize = 8;

pub fn order_slug(id: &str) -> String {
  id.chars().take(SLUG_LEN).collect()
}

/// Creation date as the user sees it, e.g. "3/9/2024".
pub fn display_date<Tz: TimeZone>(created_at: DateTime<Utc>, tz: &Tz) -> String
where
  Tz::Offset: fmt::Display,
{
  created_at
    .with_timezone(tz)
    .format("%-m/%-d/%Y")
    .to_string()
}

pub fn item_count_label(count: usize) -> String {
  if count == 1 {
    "1 item".to_string()
  } else {
    format!("{} items", count)
  }
}

pub fn format_currency(amount: Decimal) -> String {
  format!(
    "${:.2}",
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
  )
}

/// Build an [`Order`] from a row.
///
/// Lines are always mapped; the joined item is only present when the row
/// came from the detail query. Fails if the status is not one we know.
pub fn order_from_row<G: Gateway, Tz: TimeZone>(
  gateway: &G,
  row: OrderRow,
  placeholder: &str,
  tz: &Tz,
) -> Result<Order, UnknownStatus>
where
  Tz::Offset: fmt::Display,
{
  let status: OrderStatus = row.status.parse()?;
  let items: Vec<OrderLine> = row
    .order_items
    .into_iter()
    .map(|line| line_from_row(gateway, line, placeholder))
    .collect();

  Ok(Order {
    slug: order_slug(&row.id),
    date: display_date(row.created_at, tz),
    item: item_count_label(items.len()),
    details: format_currency(row.total_amount),
    id: row.id,
    status,
    created_at: row.created_at,
    total: row.total_amount,
    shipping_address: row.shipping_address.unwrap_or_default(),
    payment_method: row.payment_method.unwrap_or_default(),
    tracking_number: row.tracking_number,
    notes: row.notes,
    items,
  })
}

fn line_from_row<G: Gateway>(gateway: &G, row: OrderLineRow, placeholder: &str) -> OrderLine {
  OrderLine {
    item_id: row.item_id,
    quantity: row.quantity,
    price_at_purchase: row.price_at_purchase,
    item: row
      .items
      .and_then(|item| item_from_row(gateway, item, placeholder)),
  }
}

/// Drop the joined lines of a list fetch; only the summary fields are kept.
pub fn summarize(mut order: Order) -> Order {
  order.items.clear();
  order
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::ImageRef;
  use crate::gateway::api_types::ItemRow;
  use crate::gateway::fake::FakeGateway;

  fn row(status: &str, lines: Vec<OrderLineRow>) -> OrderRow {
    OrderRow {
      id: "0f8fad5b-d9cb-469f-a165-70867728950e".to_string(),
      status: status.to_string(),
      total_amount: Decimal::new(1998, 2),
      shipping_address: Some("221B Baker St".to_string()),
      payment_method: Some("creditCard".to_string()),
      tracking_number: None,
      notes: None,
      created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
      order_items: lines,
    }
  }

  fn line(item_id: i64, quantity: u32, item: Option<ItemRow>) -> OrderLineRow {
    OrderLineRow {
      id: None,
      item_id,
      quantity,
      price_at_purchase: Decimal::new(999, 2),
      items: item,
    }
  }

  #[test]
  fn test_display_fields() {
    let gw = FakeGateway::default();
    let order = order_from_row(&gw, row("pending", vec![line(5, 2, None)]), "ph.jpg", &Utc).unwrap();

    assert_eq!(order.slug, "0f8fad5b");
    assert_eq!(order.date, "3/9/2024");
    assert_eq!(order.item, "1 item");
    assert_eq!(order.details, "$19.98");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.shipping_address, "221B Baker St");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].item, None);
  }

  #[test]
  fn test_item_count_label() {
    assert_eq!(item_count_label(0), "0 items");
    assert_eq!(item_count_label(1), "1 item");
    assert_eq!(item_count_label(3), "3 items");
  }

  #[test]
  fn test_currency_rounds_to_cents() {
    assert_eq!(format_currency(Decimal::new(5, 0)), "$5.00");
    assert_eq!(format_currency(Decimal::new(12345, 3)), "$12.35");
  }

  #[test]
  fn test_short_ids_are_kept_whole() {
    assert_eq!(order_slug("abc"), "abc");
  }

  #[test]
  fn test_status_spelling_is_normalized() {
    let gw = FakeGateway::default();
    let order = order_from_row(&gw, row("Canceled", Vec::new()), "ph.jpg", &Utc).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
  }

  #[test]
  fn test_unknown_status_is_rejected() {
    let gw = FakeGateway::default();
    assert!(order_from_row(&gw, row("lost", Vec::new()), "ph.jpg", &Utc).is_err());
  }

  #[test]
  fn test_joined_items_are_normalized() {
    let gw = FakeGateway::default();
    let joined = ItemRow {
      id: 5,
      title: "Lemon tart".to_string(),
      price: Decimal::new(999, 2),
      hero_image: None,
      category_id: 2,
      orderable: true,
      description: None,
      nutritional_info: None,
    };
    let order = order_from_row(
      &gw,
      row("shipped", vec![line(5, 2, Some(joined))]),
      "ph.jpg",
      &Utc,
    )
    .unwrap();

    let item = order.items[0].item.as_ref().unwrap();
    assert_eq!(item.title, "Lemon tart");
    assert_eq!(item.hero_image, ImageRef::Placeholder("ph.jpg".to_string()));
  }

  #[test]
  fn test_summarize_drops_lines() {
    let gw = FakeGateway::default();
    let order = order_from_row(&gw, row("pending", vec![line(5, 2, None)]), "ph.jpg", &Utc).unwrap();
    let summary = summarize(order);
    assert!(summary.items.is_empty());
    assert_eq!(summary.item, "1 item");
  }
}

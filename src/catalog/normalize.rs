//! Mapping from backend rows to catalog types.

use rust_decimal::Decimal;
use tracing::warn;

use super::types::{Category, ImageRef, Item};
use crate::gateway::api_types::{CategoryRow, ItemRow};
use crate::gateway::{Gateway, CATEGORY_BUCKET, ITEM_BUCKET};

/// Resolve the category image to a public URL; no image stays empty.
pub fn category_from_row<G: Gateway>(gateway: &G, row: CategoryRow) -> Category {
  let image_url = match row.image_url.as_deref().map(str::trim) {
    Some(path) if !path.is_empty() => gateway.resolve_storage_url(CATEGORY_BUCKET, path),
    _ => String::new(),
  };

  Category {
    id: row.id,
    name: row.name,
    slug: row.slug,
    image_url,
  }
}

/// Map an item row, or `None` if the row breaks the price invariant.
pub fn item_from_row<G: Gateway>(
  gateway: &G,
  row: ItemRow,
  placeholder: &str,
) -> Option<Item> {
  if row.price < Decimal::ZERO {
    warn!(item_id = row.id, price = %row.price, "dropping item with negative price");
    return None;
  }

  let hero_image = match row.hero_image.as_deref().map(str::trim) {
    Some(path) if !path.is_empty() => {
      ImageRef::Remote(gateway.resolve_storage_url(ITEM_BUCKET, path))
    }
    _ => ImageRef::Placeholder(placeholder.to_string()),
  };

  Some(Item {
    id: row.id,
    title: row.title,
    price: row.price,
    hero_image,
    category_id: row.category_id,
    orderable: row.orderable,
    description: row.description.unwrap_or_default(),
    nutritional_info: row.nutritional_info.filter(|s| !s.trim().is_empty()),
  })
}

pub fn categories_from_rows<G: Gateway>(gateway: &G, rows: Vec<CategoryRow>) -> Vec<Category> {
  rows
    .into_iter()
    .map(|row| category_from_row(gateway, row))
    .collect()
}

pub fn items_from_rows<G: Gateway>(
  gateway: &G,
  rows: Vec<ItemRow>,
  placeholder: &str,
) -> Vec<Item> {
  rows
    .into_iter()
    .filter_map(|row| item_from_row(gateway, row, placeholder))
    .collect()
}

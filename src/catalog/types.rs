use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cache::Cacheable;

/// Catalog category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id: i64,
  pub name: String,
  /// Unique, URL-safe
  pub slug: String,
  /// Fully-qualified image URL, empty when the category has no image
  pub image_url: String,
}

/// Where an item's image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum ImageRef {
  /// Fully-qualified URL served by the backend or a CDN
  Remote(String),
  /// Bundled default image
  Placeholder(String),
}

impl ImageRef {
  pub fn as_str(&self) -> &str {
    match self {
      ImageRef::Remote(url) => url,
      ImageRef::Placeholder(path) => path,
    }
  }
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id: i64,
  pub title: String,
  pub price: Decimal,
  pub hero_image: ImageRef,
  /// Not checked against the category list
  pub category_id: i64,
  pub orderable: bool,
  pub description: String,
  pub nutritional_info: Option<String>,
}

impl Cacheable for Category {
  fn entity_type() -> &'static str {
    "category"
  }
}

impl Cacheable for Item {
  fn entity_type() -> &'static str {
    "item"
  }
}

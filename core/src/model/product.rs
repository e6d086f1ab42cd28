// shopfront/src/model/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Start/end pair bounding when a product's discount applies. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OfferWindow {
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
  pub length_cm: i32,
  pub breadth_cm: i32,
  pub height_cm: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
  pub id: Uuid,
  pub color: Option<String>,
  pub size: Option<String>,
  /// Overrides the product's list price when set.
  pub price_cents: Option<i64>,
  pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  /// Whole percent, 0..=100.
  pub discount_percent: u8,
  pub offer_window: Option<OfferWindow>,
  pub stock: i32,
  pub is_blacklisted: bool,
  pub weight_grams: Option<i64>,
  pub dimensions: Option<Dimensions>,
  pub variants: Vec<ProductVariant>,
}

impl Product {
  pub fn variant(&self, variant_id: Uuid) -> Option<&ProductVariant> {
    self.variants.iter().find(|v| v.id == variant_id)
  }

  /// Units available for the product itself or the given variant.
  pub fn stock_for(&self, variant: Option<&ProductVariant>) -> i32 {
    variant.map_or(self.stock, |v| v.stock)
  }

  /// List price before any discount, honouring a variant price override.
  pub fn list_price_for(&self, variant: Option<&ProductVariant>) -> i64 {
    variant.and_then(|v| v.price_cents).unwrap_or(self.price_cents)
  }

  pub fn unit_weight_grams(&self) -> i64 {
    self.weight_grams.unwrap_or(0).max(0)
  }
}

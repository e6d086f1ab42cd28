// shopfront/src/pricing.rs

//! Discount and line pricing, always derived from the product record at the
//! moment of calculation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{OfferWindow, Product, ProductVariant};

impl OfferWindow {
  /// Inclusive on both ends; an open end never excludes `now`.
  pub fn is_active(&self, now: DateTime<Utc>) -> bool {
    self.starts_at.map_or(true, |start| now >= start) && self.ends_at.map_or(true, |end| now <= end)
  }
}

impl Product {
  /// A discount applies when it is non-zero and its offer window, if any, is open.
  pub fn discount_active(&self, now: DateTime<Utc>) -> bool {
    self.discount_percent > 0 && self.offer_window.map_or(true, |window| window.is_active(now))
  }

  /// Percentage currently taken off, 0 when no discount is active.
  pub fn effective_discount_percent(&self, now: DateTime<Utc>) -> u8 {
    if self.discount_active(now) {
      self.discount_percent.min(100)
    } else {
      0
    }
  }

  pub fn final_price_cents(&self, list_price_cents: i64, now: DateTime<Utc>) -> i64 {
    list_price_cents - percent_of(list_price_cents, self.effective_discount_percent(now))
  }
}

/// `amount * percent / 100`, rounded half up.
pub fn percent_of(amount_cents: i64, percent: u8) -> i64 {
  (amount_cents * i64::from(percent) + 50) / 100
}

/// Money and weight for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePricing {
  pub unit_price_cents: i64,
  pub discount_percent: u8,
  pub final_unit_price_cents: i64,
  pub quantity: i32,
  pub line_subtotal_cents: i64,
  pub line_discount_cents: i64,
  pub line_weight_grams: i64,
}

impl LinePricing {
  pub fn for_line(product: &Product, variant: Option<&ProductVariant>, quantity: i32, now: DateTime<Utc>) -> Self {
    let unit_price_cents = product.list_price_for(variant);
    let final_unit_price_cents = product.final_price_cents(unit_price_cents, now);
    let qty = i64::from(quantity);

    LinePricing {
      unit_price_cents,
      discount_percent: product.effective_discount_percent(now),
      final_unit_price_cents,
      quantity,
      line_subtotal_cents: unit_price_cents * qty,
      line_discount_cents: (unit_price_cents - final_unit_price_cents) * qty,
      line_weight_grams: product.unit_weight_grams() * qty,
    }
  }

  pub fn line_payable_cents(&self) -> i64 {
    self.line_subtotal_cents - self.line_discount_cents
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use uuid::Uuid;

  fn product(price_cents: i64, discount_percent: u8, offer_window: Option<OfferWindow>) -> Product {
    Product {
      id: Uuid::new_v4(),
      name: "Lamp".to_string(),
      price_cents,
      discount_percent,
      offer_window,
      stock: 10,
      is_blacklisted: false,
      weight_grams: Some(750),
      dimensions: None,
      variants: vec![],
    }
  }

  #[test]
  fn active_twenty_percent_on_two_units() {
    let now = Utc::now();
    let window = OfferWindow {
      starts_at: Some(now - Duration::days(1)),
      ends_at: Some(now + Duration::days(1)),
    };
    let line = LinePricing::for_line(&product(1000, 20, Some(window)), None, 2, now);

    assert_eq!(line.final_unit_price_cents, 800);
    assert_eq!(line.line_discount_cents, 400);
    assert_eq!(line.line_subtotal_cents, 2000);
    assert_eq!(line.line_weight_grams, 1500);
  }

  #[test]
  fn expired_window_disables_discount() {
    let now = Utc::now();
    let window = OfferWindow {
      starts_at: None,
      ends_at: Some(now - Duration::seconds(1)),
    };
    let p = product(1000, 20, Some(window));

    assert!(!p.discount_active(now));
    assert_eq!(p.final_price_cents(1000, now), 1000);
  }

  #[test]
  fn future_window_disables_discount() {
    let now = Utc::now();
    let window = OfferWindow {
      starts_at: Some(now + Duration::hours(2)),
      ends_at: None,
    };
    assert!(!product(1000, 20, Some(window)).discount_active(now));
  }

  #[test]
  fn discount_without_window_is_always_active() {
    assert!(product(1000, 10, None).discount_active(Utc::now()));
  }

  #[test]
  fn percent_rounds_half_up() {
    assert_eq!(percent_of(999, 15), 150); // 149.85
    assert_eq!(percent_of(10, 5), 1); // 0.5
    assert_eq!(percent_of(10, 4), 0); // 0.4
  }

  #[test]
  fn variant_price_overrides_list_price() {
    let mut p = product(1000, 0, None);
    let variant = ProductVariant {
      id: Uuid::new_v4(),
      color: Some("red".to_string()),
      size: None,
      price_cents: Some(1200),
      stock: 3,
    };
    p.variants.push(variant.clone());

    let line = LinePricing::for_line(&p, Some(&variant), 1, Utc::now());
    assert_eq!(line.unit_price_cents, 1200);
    assert_eq!(p.stock_for(Some(&variant)), 3);
  }
}

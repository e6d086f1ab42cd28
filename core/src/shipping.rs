// shopfront/src/shipping.rs

//! Carrier-facing ports: live rate estimation and shipment registration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ShopResult;
use crate::model::Order;

/// Store-wide shipping rules used when no live rate is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingPolicy {
  pub origin_postcode: String,
  /// Payable amounts strictly above this ship free.
  pub free_shipping_threshold_cents: i64,
  pub flat_fee_cents: i64,
}

impl Default for ShippingPolicy {
  fn default() -> Self {
    ShippingPolicy {
      origin_postcode: String::new(),
      free_shipping_threshold_cents: 50_000,
      flat_fee_cents: 5_000,
    }
  }
}

impl ShippingPolicy {
  pub fn flat_rate_cents(&self, payable_cents: i64) -> i64 {
    if payable_cents > self.free_shipping_threshold_cents {
      0
    } else {
      self.flat_fee_cents
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRateRequest {
  pub origin_postcode: String,
  pub destination_postcode: String,
  pub weight_grams: i64,
  pub cash_on_delivery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierRate {
  pub courier_id: i64,
  pub courier_name: String,
  pub rate_cents: i64,
  pub estimated_delivery_days: Option<u32>,
}

/// Everything a carrier offered for one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateQuote {
  pub couriers: Vec<CourierRate>,
  pub recommended_courier_id: Option<i64>,
}

impl RateQuote {
  /// The carrier's recommended courier when it is among the offers, else the cheapest.
  pub fn select_courier(&self) -> Option<&CourierRate> {
    self
      .recommended_courier_id
      .and_then(|id| self.couriers.iter().find(|c| c.courier_id == id))
      .or_else(|| self.couriers.iter().min_by_key(|c| c.rate_cents))
  }
}

#[async_trait]
pub trait ShippingRateEstimator: Send + Sync {
  async fn estimate(&self, request: &ShippingRateRequest) -> ShopResult<RateQuote>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentReceipt {
  pub carrier_order_id: String,
  pub shipment_id: Option<String>,
}

#[async_trait]
pub trait ShipmentRegistrar: Send + Sync {
  async fn register(&self, order: &Order) -> ShopResult<ShipmentReceipt>;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rate(id: i64, cents: i64) -> CourierRate {
    CourierRate {
      courier_id: id,
      courier_name: format!("courier-{id}"),
      rate_cents: cents,
      estimated_delivery_days: Some(3),
    }
  }

  #[test]
  fn recommended_courier_wins_over_cheapest() {
    let quote = RateQuote {
      couriers: vec![rate(1, 4000), rate(2, 9000)],
      recommended_courier_id: Some(2),
    };
    assert_eq!(quote.select_courier().map(|c| c.courier_id), Some(2));
  }

  #[test]
  fn cheapest_when_recommendation_missing_or_unknown() {
    let mut quote = RateQuote {
      couriers: vec![rate(1, 4000), rate(2, 3500), rate(3, 9000)],
      recommended_courier_id: None,
    };
    assert_eq!(quote.select_courier().map(|c| c.courier_id), Some(2));

    quote.recommended_courier_id = Some(42);
    assert_eq!(quote.select_courier().map(|c| c.courier_id), Some(2));
  }

  #[test]
  fn flat_rate_is_free_only_above_threshold() {
    let policy = ShippingPolicy::default();
    assert_eq!(policy.flat_rate_cents(50_001), 0);
    assert_eq!(policy.flat_rate_cents(50_000), 5_000);
    assert_eq!(policy.flat_rate_cents(0), 5_000);
  }
}

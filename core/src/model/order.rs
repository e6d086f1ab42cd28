// shopfront/src/model/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Address, Dimensions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Placed,
  Confirmed,
  Packed,
  Shipped,
  Delivered,
  Cancelled,
  Returned,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Placed,
    OrderStatus::Confirmed,
    OrderStatus::Packed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Returned,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Placed => "PLACED",
      OrderStatus::Confirmed => "CONFIRMED",
      OrderStatus::Packed => "PACKED",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
      OrderStatus::Returned => "RETURNED",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| UnknownStatus(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutType {
  Cart,
  BuyNow,
}

impl CheckoutType {
  pub fn as_str(self) -> &'static str {
    match self {
      CheckoutType::Cart => "CART",
      CheckoutType::BuyNow => "BUY_NOW",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
  Cod,
  #[default]
  Online,
}

impl PaymentMode {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMode::Cod => "COD",
      PaymentMode::Online => "ONLINE",
    }
  }

  pub fn is_cod(self) -> bool {
    self == PaymentMode::Cod
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

impl PaymentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentStatus::Pending => "PENDING",
      PaymentStatus::Paid => "PAID",
      PaymentStatus::Failed => "FAILED",
      PaymentStatus::Refunded => "REFUNDED",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
  Customer,
  Admin,
  System,
}

impl ActorRole {
  pub fn as_str(self) -> &'static str {
    match self {
      ActorRole::Customer => "CUSTOMER",
      ActorRole::Admin => "ADMIN",
      ActorRole::System => "SYSTEM",
    }
  }
}

/// Who caused a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
  pub role: ActorRole,
  pub user_id: Option<Uuid>,
}

impl Actor {
  pub fn customer(user_id: Uuid) -> Self {
    Actor {
      role: ActorRole::Customer,
      user_id: Some(user_id),
    }
  }

  pub fn admin(user_id: Uuid) -> Self {
    Actor {
      role: ActorRole::Admin,
      user_id: Some(user_id),
    }
  }

  pub fn system() -> Self {
    Actor {
      role: ActorRole::System,
      user_id: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
  /// `None` only for the entry written when the order is created.
  pub from: Option<OrderStatus>,
  pub status: OrderStatus,
  pub changed_at: DateTime<Utc>,
  pub actor: Actor,
  pub reason: String,
}

/// A priced line frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub name: String,
  pub color: Option<String>,
  pub size: Option<String>,
  pub unit_price_cents: i64,
  pub discount_percent: u8,
  pub final_unit_price_cents: i64,
  pub quantity: i32,
  pub line_subtotal_cents: i64,
  pub line_discount_cents: i64,
  pub weight_grams: i64,
  pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub checkout_type: CheckoutType,
  pub items: Vec<OrderItem>,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub total_weight_grams: i64,
  pub courier_name: Option<String>,
  pub estimated_delivery_days: Option<u32>,
  pub shipping_address: Address,
  pub payment_mode: PaymentMode,
  pub payment_status: PaymentStatus,
  pub coupon_code: Option<String>,
  pub status: OrderStatus,
  pub status_history: Vec<StatusHistoryEntry>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub cancellation_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// `subtotal - discount + shipping`, the only total an order may carry.
  pub fn expected_total_cents(&self) -> i64 {
    self.subtotal_cents - self.discount_cents + self.shipping_cents
  }
}

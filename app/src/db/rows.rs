// shopfront_app/src/db/rows.rs

//! Row shapes returned by the runtime queries and their conversion into the
//! core model. Enums are stored as their upper-case names.

use chrono::{DateTime, Utc};
use shopfront::model::{
  Actor, ActorRole, Address, CartItem, CheckoutType, Dimensions, OfferWindow, Order, OrderItem, OrderStatus,
  PaymentMode, PaymentStatus, Product, ProductVariant, StatusHistoryEntry,
};
use shopfront::{ShopError, ShopResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

const CHECKOUT_TYPES: [CheckoutType; 2] = [CheckoutType::Cart, CheckoutType::BuyNow];
const PAYMENT_MODES: [PaymentMode; 2] = [PaymentMode::Cod, PaymentMode::Online];
const PAYMENT_STATUSES: [PaymentStatus; 4] = [
  PaymentStatus::Pending,
  PaymentStatus::Paid,
  PaymentStatus::Failed,
  PaymentStatus::Refunded,
];
const ACTOR_ROLES: [ActorRole; 3] = [ActorRole::Customer, ActorRole::Admin, ActorRole::System];

fn decode<T: Copy>(column: &str, value: &str, all: &[T], name: fn(T) -> &'static str) -> ShopResult<T> {
  all
    .iter()
    .copied()
    .find(|v| name(*v) == value)
    .ok_or_else(|| ShopError::storage(anyhow::anyhow!("unexpected {column} value '{value}'")))
}

fn decode_status(value: &str) -> ShopResult<OrderStatus> {
  value.parse::<OrderStatus>().map_err(ShopError::storage)
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub discount_percent: i16,
  pub offer_starts_at: Option<DateTime<Utc>>,
  pub offer_ends_at: Option<DateTime<Utc>>,
  pub stock: i32,
  pub is_blacklisted: bool,
  pub weight_grams: Option<i64>,
  pub length_cm: Option<i32>,
  pub breadth_cm: Option<i32>,
  pub height_cm: Option<i32>,
}

#[derive(Debug, FromRow)]
pub struct VariantRow {
  pub id: Uuid,
  pub color: Option<String>,
  pub size: Option<String>,
  pub price_cents: Option<i64>,
  pub stock: i32,
}

impl ProductRow {
  pub fn into_product(self, variants: Vec<VariantRow>) -> Product {
    let offer_window = match (self.offer_starts_at, self.offer_ends_at) {
      (None, None) => None,
      (starts_at, ends_at) => Some(OfferWindow { starts_at, ends_at }),
    };
    let dimensions = match (self.length_cm, self.breadth_cm, self.height_cm) {
      (Some(length_cm), Some(breadth_cm), Some(height_cm)) => Some(Dimensions {
        length_cm,
        breadth_cm,
        height_cm,
      }),
      _ => None,
    };

    Product {
      id: self.id,
      name: self.name,
      price_cents: self.price_cents,
      discount_percent: u8::try_from(self.discount_percent.clamp(0, 100)).unwrap_or(0),
      offer_window,
      stock: self.stock,
      is_blacklisted: self.is_blacklisted,
      weight_grams: self.weight_grams,
      dimensions,
      variants: variants
        .into_iter()
        .map(|v| ProductVariant {
          id: v.id,
          color: v.color,
          size: v.size,
          price_cents: v.price_cents,
          stock: v.stock,
        })
        .collect(),
    }
  }
}

#[derive(Debug, FromRow)]
pub struct CartItemRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub color: Option<String>,
  pub size: Option<String>,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub added_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
  fn from(row: CartItemRow) -> Self {
    CartItem {
      id: row.id,
      user_id: row.user_id,
      product_id: row.product_id,
      variant_id: row.variant_id,
      color: row.color,
      size: row.size,
      quantity: row.quantity,
      unit_price_cents: row.unit_price_cents,
      added_at: row.added_at,
    }
  }
}

#[derive(Debug, FromRow)]
pub struct AddressRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
  pub is_default: bool,
}

impl From<AddressRow> for Address {
  fn from(row: AddressRow) -> Self {
    Address {
      id: row.id,
      user_id: row.user_id,
      full_name: row.full_name,
      phone: row.phone,
      line1: row.line1,
      line2: row.line2,
      city: row.city,
      state: row.state,
      postal_code: row.postal_code,
      country: row.country,
      is_default: row.is_default,
    }
  }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub checkout_type: String,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub total_weight_grams: i64,
  pub courier_name: Option<String>,
  pub estimated_delivery_days: Option<i32>,
  pub shipping_address: Json<Address>,
  pub payment_mode: String,
  pub payment_status: String,
  pub coupon_code: Option<String>,
  pub status: String,
  pub delivered_at: Option<DateTime<Utc>>,
  pub cancellation_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct OrderItemRow {
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub name: String,
  pub color: Option<String>,
  pub size: Option<String>,
  pub unit_price_cents: i64,
  pub discount_percent: i16,
  pub final_unit_price_cents: i64,
  pub quantity: i32,
  pub line_subtotal_cents: i64,
  pub line_discount_cents: i64,
  pub weight_grams: i64,
  pub dimensions: Option<Json<Dimensions>>,
}

impl From<OrderItemRow> for OrderItem {
  fn from(row: OrderItemRow) -> Self {
    OrderItem {
      product_id: row.product_id,
      variant_id: row.variant_id,
      name: row.name,
      color: row.color,
      size: row.size,
      unit_price_cents: row.unit_price_cents,
      discount_percent: u8::try_from(row.discount_percent.clamp(0, 100)).unwrap_or(0),
      final_unit_price_cents: row.final_unit_price_cents,
      quantity: row.quantity,
      line_subtotal_cents: row.line_subtotal_cents,
      line_discount_cents: row.line_discount_cents,
      weight_grams: row.weight_grams,
      dimensions: row.dimensions.map(|d| d.0),
    }
  }
}

#[derive(Debug, FromRow)]
pub struct HistoryRow {
  pub order_id: Uuid,
  pub from_status: Option<String>,
  pub status: String,
  pub changed_at: DateTime<Utc>,
  pub actor_role: String,
  pub actor_user_id: Option<Uuid>,
  pub reason: String,
}

impl TryFrom<HistoryRow> for StatusHistoryEntry {
  type Error = ShopError;

  fn try_from(row: HistoryRow) -> ShopResult<Self> {
    Ok(StatusHistoryEntry {
      from: row.from_status.as_deref().map(decode_status).transpose()?,
      status: decode_status(&row.status)?,
      changed_at: row.changed_at,
      actor: Actor {
        role: decode("actor_role", &row.actor_role, &ACTOR_ROLES, ActorRole::as_str)?,
        user_id: row.actor_user_id,
      },
      reason: row.reason,
    })
  }
}

impl OrderRow {
  pub fn into_order(self, items: Vec<OrderItem>, status_history: Vec<StatusHistoryEntry>) -> ShopResult<Order> {
    Ok(Order {
      id: self.id,
      user_id: self.user_id,
      checkout_type: decode("checkout_type", &self.checkout_type, &CHECKOUT_TYPES, CheckoutType::as_str)?,
      items,
      subtotal_cents: self.subtotal_cents,
      discount_cents: self.discount_cents,
      shipping_cents: self.shipping_cents,
      total_cents: self.total_cents,
      total_weight_grams: self.total_weight_grams,
      courier_name: self.courier_name,
      estimated_delivery_days: self.estimated_delivery_days.and_then(|d| u32::try_from(d).ok()),
      shipping_address: self.shipping_address.0,
      payment_mode: decode("payment_mode", &self.payment_mode, &PAYMENT_MODES, PaymentMode::as_str)?,
      payment_status: decode(
        "payment_status",
        &self.payment_status,
        &PAYMENT_STATUSES,
        PaymentStatus::as_str,
      )?,
      coupon_code: self.coupon_code,
      status: decode_status(&self.status)?,
      status_history,
      delivered_at: self.delivered_at,
      cancellation_reason: self.cancellation_reason,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stored_enum_names_decode() {
    assert_eq!(
      decode("checkout_type", "BUY_NOW", &CHECKOUT_TYPES, CheckoutType::as_str).unwrap(),
      CheckoutType::BuyNow
    );
    assert_eq!(
      decode("payment_status", "REFUNDED", &PAYMENT_STATUSES, PaymentStatus::as_str).unwrap(),
      PaymentStatus::Refunded
    );
    assert!(decode("payment_mode", "CARD", &PAYMENT_MODES, PaymentMode::as_str).is_err());
  }

  #[test]
  fn product_row_without_window_or_full_dimensions() {
    let row = ProductRow {
      id: Uuid::new_v4(),
      name: "Lamp".to_string(),
      price_cents: 1000,
      discount_percent: 150,
      offer_starts_at: None,
      offer_ends_at: None,
      stock: 3,
      is_blacklisted: false,
      weight_grams: Some(400),
      length_cm: Some(10),
      breadth_cm: None,
      height_cm: Some(5),
    };
    let product = row.into_product(vec![]);
    assert!(product.offer_window.is_none());
    assert!(product.dimensions.is_none());
    assert_eq!(product.discount_percent, 100);
  }
}

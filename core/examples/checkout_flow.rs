// shopfront/examples/checkout_flow.rs

//! Quotes a cart, places the order, walks it to delivery and shows a
//! cancellation putting stock back. Everything runs against `MemoryStore`.

use chrono::Utc;
use shopfront::model::{Actor, Address, CartItem, OrderStatus, PaymentMode, Product};
use shopfront::{
  MemoryStore, OrderCalculator, OrderService, PlaceOrderRequest, QuoteRequest, ShippingPolicy, ShopResult,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn product(name: &str, price_cents: i64, discount_percent: u8, stock: i32) -> Product {
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    price_cents,
    discount_percent,
    offer_window: None,
    stock,
    is_blacklisted: false,
    weight_grams: Some(1_200),
    dimensions: None,
    variants: vec![],
  }
}

#[tokio::main]
async fn main() -> ShopResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let store = Arc::new(MemoryStore::new());
  let user_id = Uuid::new_v4();
  let address = Address {
    id: Uuid::new_v4(),
    user_id,
    full_name: "Meera Iyer".to_string(),
    phone: "9000000001".to_string(),
    line1: "7 MG Road".to_string(),
    line2: None,
    city: "Chennai".to_string(),
    state: "TN".to_string(),
    postal_code: "600001".to_string(),
    country: "IN".to_string(),
    is_default: true,
  };
  store.insert_address(address.clone());

  let kettle = product("Kettle", 30_000, 10, 5);
  let teapot = product("Teapot", 12_000, 0, 2);
  store.insert_product(kettle.clone());
  store.insert_product(teapot.clone());
  for (item, quantity) in [(&kettle, 1), (&teapot, 1)] {
    store.add_to_cart(CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id: item.id,
      variant_id: None,
      color: None,
      size: None,
      quantity,
      unit_price_cents: item.price_cents,
      added_at: Utc::now(),
    });
  }

  let policy = ShippingPolicy {
    origin_postcode: "110001".to_string(),
    ..ShippingPolicy::default()
  };
  let calculator = OrderCalculator::new(store.clone(), store.clone(), store.clone(), None, policy);
  let service = OrderService::new(calculator, store.clone(), None)?;

  let quote = service
    .quote(
      user_id,
      &QuoteRequest {
        address_id: Some(address.id),
        ..QuoteRequest::default()
      },
    )
    .await?;
  info!(summary = ?quote.summary, "Cart quoted.");

  let order = service
    .place_order(
      user_id,
      PlaceOrderRequest {
        address_id: Some(address.id),
        payment_mode: PaymentMode::Cod,
        ..PlaceOrderRequest::default()
      },
    )
    .await?;
  info!(order_id = %order.id, total_cents = order.total_cents, "Order placed.");

  let admin = Actor::admin(Uuid::new_v4());
  for next in [OrderStatus::Confirmed, OrderStatus::Packed, OrderStatus::Shipped, OrderStatus::Delivered] {
    let updated = service.update_status(admin, order.id, next, None).await?;
    info!(status = %updated.status, payment = ?updated.payment_status, "Status advanced.");
  }

  match service.update_status(admin, order.id, OrderStatus::Cancelled, None).await {
    Ok(_) => info!("Unexpected: a delivered order was cancelled."),
    Err(e) => info!(error = %e, "Cancellation refused as expected."),
  }

  let second = service
    .place_order(
      user_id,
      PlaceOrderRequest {
        address_id: Some(address.id),
        product_id: Some(teapot.id),
        quantity: Some(1),
        ..PlaceOrderRequest::default()
      },
    )
    .await?;
  let cancelled = service.cancel_order(user_id, second.id, "Found a cheaper one").await?;
  info!(
    status = %cancelled.status,
    teapot_stock = ?store.product_snapshot(teapot.id).map(|p| p.stock),
    "Second order cancelled."
  );

  Ok(())
}

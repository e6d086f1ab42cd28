// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::test;
use chrono::Utc;
use once_cell::sync::Lazy;
use shopfront::model::{Address, CartItem, Product};
use shopfront::MemoryStore;
use shopfront_app::config::AppConfig;
use shopfront_app::state::AppState;
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Configuration for a server that never touches Postgres or Shiprocket.
pub fn test_config() -> AppConfig {
  AppConfig::from_lookup(|name| match name {
    "DATABASE_URL" => Some("postgres://unused@localhost/shopfront".to_string()),
    "SHIPPING_ORIGIN_POSTCODE" => Some("110001".to_string()),
    _ => None,
  })
  .expect("test configuration should load")
}

pub fn product(name: &str, price_cents: i64, stock: i32) -> Product {
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    price_cents,
    discount_percent: 0,
    offer_window: None,
    stock,
    is_blacklisted: false,
    weight_grams: Some(750),
    dimensions: None,
    variants: vec![],
  }
}

pub fn address(user_id: Uuid) -> Address {
  Address {
    id: Uuid::new_v4(),
    user_id,
    full_name: "Ravi Menon".to_string(),
    phone: "9123456780".to_string(),
    line1: "4 Church Street".to_string(),
    line2: Some("Flat 2B".to_string()),
    city: "Bengaluru".to_string(),
    state: "KA".to_string(),
    postal_code: "560001".to_string(),
    country: "IN".to_string(),
    is_default: true,
  }
}

pub fn cart_item(user_id: Uuid, product: &Product, quantity: i32) -> CartItem {
  CartItem {
    id: Uuid::new_v4(),
    user_id,
    product_id: product.id,
    variant_id: None,
    color: None,
    size: None,
    quantity,
    unit_price_cents: product.price_cents,
    added_at: Utc::now(),
  }
}

/// One buyer with a saved address, backed by an in-memory store.
pub struct TestShop {
  pub store: MemoryStore,
  pub user_id: Uuid,
  pub address: Address,
}

impl TestShop {
  pub fn new() -> Self {
    setup_tracing();
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let address = address(user_id);
    store.insert_address(address.clone());
    Self { store, user_id, address }
  }

  pub fn stock(&self, product_id: Uuid) -> i32 {
    self.store.product_snapshot(product_id).map(|p| p.stock).unwrap_or_default()
  }

  pub fn state(&self) -> AppState {
    AppState::build(test_config(), self.store.clone()).expect("app state should build")
  }
}

pub fn as_user(req: test::TestRequest, user_id: Uuid) -> test::TestRequest {
  req.insert_header(("X-User-ID", user_id.to_string()))
}

pub fn as_admin(req: test::TestRequest) -> test::TestRequest {
  req
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .insert_header(("X-User-Role", "admin"))
}

// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use shopfront::model::{Address, CartItem, Order, Product, ProductVariant};
use shopfront::{
  Carts, Catalog, CourierRate, OrderCalculator, OrderService, RateQuote, ShipmentReceipt, ShipmentRegistrar, ShippingPolicy,
  ShippingRateEstimator, ShippingRateRequest, ShopError, ShopResult,
};
use shopfront::MemoryStore;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

// --- Helper for Tracing Setup ---
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

// --- Fixtures ---
pub fn product(name: &str, price_cents: i64, stock: i32) -> Product {
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    price_cents,
    discount_percent: 0,
    offer_window: None,
    stock,
    is_blacklisted: false,
    weight_grams: Some(500),
    dimensions: None,
    variants: vec![],
  }
}

pub fn variant(color: &str, price_cents: Option<i64>, stock: i32) -> ProductVariant {
  ProductVariant {
    id: Uuid::new_v4(),
    color: Some(color.to_string()),
    size: None,
    price_cents,
    stock,
  }
}

pub fn address(user_id: Uuid, postal_code: &str, is_default: bool) -> Address {
  Address {
    id: Uuid::new_v4(),
    user_id,
    full_name: "Asha Rao".to_string(),
    phone: "9876543210".to_string(),
    line1: "12 Lake Road".to_string(),
    line2: None,
    city: "Pune".to_string(),
    state: "MH".to_string(),
    postal_code: postal_code.to_string(),
    country: "IN".to_string(),
    is_default,
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

/// A store with one buyer who has a default address.
pub struct Shop {
  pub store: MemoryStore,
  pub user_id: Uuid,
  pub address: Address,
}

impl Shop {
  pub fn new() -> Self {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let address = address(user_id, "411001", true);
    store.insert_address(address.clone());
    Shop {
      store,
      user_id,
      address,
    }
  }

  pub fn stock(&self, product_id: Uuid) -> i32 {
    self.store.product_snapshot(product_id).map_or(-1, |p| p.stock)
  }

  pub fn calculator(&self, estimator: Option<Arc<dyn ShippingRateEstimator>>) -> OrderCalculator {
    let store = Arc::new(self.store.clone());
    OrderCalculator::new(
      store.clone(),
      store.clone(),
      store,
      estimator,
      ShippingPolicy {
        origin_postcode: "110001".to_string(),
        ..ShippingPolicy::default()
      },
    )
  }

  pub fn service(&self, registrar: Option<Arc<dyn ShipmentRegistrar>>) -> OrderService {
    OrderService::new(self.calculator(None), Arc::new(self.store.clone()), registrar)
      .expect("placement pipeline builds")
  }

  pub async fn cart(&self) -> Vec<CartItem> {
    self.store.cart_items(self.user_id).await.unwrap()
  }
}

/// A catalog that lets a callback run in the middle of a quote, once per
/// product lookup, to simulate a buyer editing their cart during checkout.
pub struct MeddlingCatalog {
  pub store: MemoryStore,
  pub on_lookup: Box<dyn Fn(&MemoryStore, Uuid) + Send + Sync>,
}

#[async_trait]
impl Catalog for MeddlingCatalog {
  async fn product(&self, product_id: Uuid) -> ShopResult<Option<Product>> {
    (self.on_lookup)(&self.store, product_id);
    self.store.product(product_id).await
  }
}

impl Shop {
  /// A service whose quotes look products up through `catalog`.
  pub fn service_with_catalog(&self, catalog: Arc<dyn Catalog>) -> OrderService {
    let store = Arc::new(self.store.clone());
    let calculator = OrderCalculator::new(
      catalog,
      store.clone(),
      store.clone(),
      None,
      ShippingPolicy {
        origin_postcode: "110001".to_string(),
        ..ShippingPolicy::default()
      },
    );
    OrderService::new(calculator, store, None).expect("placement pipeline builds")
  }
}

// --- Carrier doubles ---
pub struct FixedRates {
  pub quote: RateQuote,
  pub calls: AtomicUsize,
  pub last_request: Mutex<Option<ShippingRateRequest>>,
}

impl FixedRates {
  pub fn new(couriers: Vec<CourierRate>, recommended_courier_id: Option<i64>) -> Arc<Self> {
    Arc::new(FixedRates {
      quote: RateQuote {
        couriers,
        recommended_courier_id,
      },
      calls: AtomicUsize::new(0),
      last_request: Mutex::new(None),
    })
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ShippingRateEstimator for FixedRates {
  async fn estimate(&self, request: &ShippingRateRequest) -> ShopResult<RateQuote> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last_request.lock() = Some(request.clone());
    Ok(self.quote.clone())
  }
}

pub struct FailingRates;

#[async_trait]
impl ShippingRateEstimator for FailingRates {
  async fn estimate(&self, _request: &ShippingRateRequest) -> ShopResult<RateQuote> {
    Err(ShopError::shipping(anyhow::anyhow!("carrier timed out")))
  }
}

pub fn courier(courier_id: i64, name: &str, rate_cents: i64) -> CourierRate {
  CourierRate {
    courier_id,
    courier_name: name.to_string(),
    rate_cents,
    estimated_delivery_days: Some(4),
  }
}

#[derive(Default)]
pub struct RecordingRegistrar {
  pub registered: Mutex<Vec<Uuid>>,
  pub fail: bool,
}

impl RecordingRegistrar {
  /// Registration runs in the background; waits until `count` orders arrived.
  pub async fn wait_for(&self, count: usize) -> Vec<Uuid> {
    for _ in 0..200 {
      let seen = self.registered.lock().clone();
      if seen.len() >= count {
        return seen;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    self.registered.lock().clone()
  }
}

/// A carrier that accepts the connection and never answers.
pub struct StalledRegistrar;

#[async_trait]
impl ShipmentRegistrar for StalledRegistrar {
  async fn register(&self, _order: &Order) -> ShopResult<ShipmentReceipt> {
    tokio::time::sleep(Duration::from_secs(3_600)).await;
    Err(ShopError::shipping(anyhow::anyhow!("carrier never answered")))
  }
}

#[async_trait]
impl ShipmentRegistrar for RecordingRegistrar {
  async fn register(&self, order: &Order) -> ShopResult<ShipmentReceipt> {
    self.registered.lock().push(order.id);
    if self.fail {
      return Err(ShopError::shipping(anyhow::anyhow!("carrier rejected the shipment")));
    }
    Ok(ShipmentReceipt {
      carrier_order_id: format!("SR-{}", order.id.simple()),
      shipment_id: None,
    })
  }
}

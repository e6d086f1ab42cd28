// shopfront/src/store/mod.rs

//! Persistence ports. The HTTP app backs them with Postgres; tests and local
//! runs use [`MemoryStore`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};
use crate::model::{Address, CartItem, Order, OrderStatus, Product};

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn product(&self, product_id: Uuid) -> ShopResult<Option<Product>>;
}

#[async_trait]
pub trait Carts: Send + Sync {
  async fn cart_items(&self, user_id: Uuid) -> ShopResult<Vec<CartItem>>;
}

#[async_trait]
pub trait AddressBook: Send + Sync {
  /// The address only if it belongs to `user_id`.
  async fn address(&self, user_id: Uuid, address_id: Uuid) -> ShopResult<Option<Address>>;

  async fn default_address(&self, user_id: Uuid) -> ShopResult<Option<Address>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
  /// 1-based.
  pub page: u32,
  pub limit: u32,
  pub status: Option<OrderStatus>,
}

impl Default for OrderFilter {
  fn default() -> Self {
    OrderFilter {
      page: 1,
      limit: 10,
      status: None,
    }
  }
}

impl OrderFilter {
  pub const MAX_LIMIT: u32 = 100;

  /// Clamps page and limit into their accepted ranges.
  pub fn normalized(mut self) -> Self {
    self.page = self.page.max(1);
    self.limit = self.limit.clamp(1, Self::MAX_LIMIT);
    self
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
  pub orders: Vec<Order>,
  pub total: u64,
  pub page: u32,
  pub limit: u32,
  pub total_pages: u64,
}

impl OrderPage {
  pub fn new(orders: Vec<Order>, total: u64, filter: &OrderFilter) -> Self {
    OrderPage {
      orders,
      total,
      page: filter.page,
      limit: filter.limit,
      total_pages: total.div_ceil(u64::from(filter.limit.max(1))),
    }
  }
}

/// A cart row that went into a quote, with the quantity it had when priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedCartItem {
  pub id: Uuid,
  pub quantity: i32,
}

/// Raised when the cart no longer holds the rows a checkout priced.
pub fn stale_cart() -> ShopError {
  ShopError::Validation("Your cart changed during checkout, please review it and try again".to_string())
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists a new order atomically: insert it, take every line's quantity
  /// out of stock only while `stock >= quantity`, and remove exactly the
  /// `cart_items` rows that were priced. Any short line fails the whole call
  /// with `OutOfStock`; a priced row that is gone or whose quantity changed
  /// fails it with the stale-cart validation error. Either way nothing is
  /// written. Rows added to the cart after pricing stay in the cart.
  async fn place(&self, order: &Order, cart_items: &[PricedCartItem]) -> ShopResult<()>;

  async fn find(&self, order_id: Uuid) -> ShopResult<Option<Order>>;

  /// Persists a status change made by `status::apply_transition`, including
  /// its newest history entry. Fails with `Conflict` when the stored status is
  /// no longer `expected`. With `restock`, every line's quantity goes back
  /// into stock in the same unit of work.
  async fn save_transition(&self, order: &Order, expected: OrderStatus, restock: bool) -> ShopResult<()>;

  /// Newest first.
  async fn orders_for_user(&self, user_id: Uuid) -> ShopResult<Vec<Order>>;

  /// Newest first, one page.
  async fn list(&self, filter: &OrderFilter) -> ShopResult<OrderPage>;
}

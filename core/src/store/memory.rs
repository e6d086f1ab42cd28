// shopfront/src/store/memory.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::{stale_cart, AddressBook, Carts, Catalog, OrderFilter, OrderPage, OrderStore, PricedCartItem};
use crate::error::{ShopError, ShopResult};
use crate::model::{Address, CartItem, CheckoutType, Order, OrderItem, OrderStatus, Product};

#[derive(Debug, Default)]
struct MemoryState {
  products: HashMap<Uuid, Product>,
  carts: HashMap<Uuid, Vec<CartItem>>,
  addresses: Vec<Address>,
  /// Insertion order, oldest first.
  orders: Vec<Order>,
}

/// Every port behind one mutex. Each call is a single critical section, which
/// gives `place` and `save_transition` the same all-or-nothing behaviour as a
/// database transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_product(&self, product: Product) {
    self.state.lock().products.insert(product.id, product);
  }

  pub fn add_to_cart(&self, item: CartItem) {
    self.state.lock().carts.entry(item.user_id).or_default().push(item);
  }

  /// Changes the quantity of one cart row, as the buyer editing their cart would.
  pub fn set_cart_quantity(&self, user_id: Uuid, cart_item_id: Uuid, quantity: i32) {
    let mut state = self.state.lock();
    if let Some(row) = state
      .carts
      .get_mut(&user_id)
      .and_then(|rows| rows.iter_mut().find(|row| row.id == cart_item_id))
    {
      row.quantity = quantity;
    }
  }

  pub fn insert_address(&self, address: Address) {
    let mut state = self.state.lock();
    if address.is_default {
      for existing in state.addresses.iter_mut().filter(|a| a.user_id == address.user_id) {
        existing.is_default = false;
      }
    }
    state.addresses.push(address);
  }

  pub fn product_snapshot(&self, product_id: Uuid) -> Option<Product> {
    self.state.lock().products.get(&product_id).cloned()
  }

  pub fn cart_len(&self, user_id: Uuid) -> usize {
    self.state.lock().carts.get(&user_id).map_or(0, Vec::len)
  }

  pub fn order_count(&self) -> usize {
    self.state.lock().orders.len()
  }
}

/// Applies `delta` to the stock a line draws from. Negative deltas fail when
/// they would take stock below zero.
fn adjust_stock(products: &mut HashMap<Uuid, Product>, item: &OrderItem, delta: i32) -> ShopResult<()> {
  let out_of_stock = || ShopError::OutOfStock {
    product_id: item.product_id,
    name: item.name.clone(),
  };
  let product = products.get_mut(&item.product_id).ok_or_else(out_of_stock)?;
  let stock = match item.variant_id {
    Some(variant_id) => {
      &mut product
        .variants
        .iter_mut()
        .find(|v| v.id == variant_id)
        .ok_or_else(out_of_stock)?
        .stock
    }
    None => &mut product.stock,
  };
  if *stock + delta < 0 {
    return Err(out_of_stock());
  }
  *stock += delta;
  Ok(())
}

fn has_stock_slot(products: &HashMap<Uuid, Product>, item: &OrderItem) -> bool {
  products.get(&item.product_id).is_some_and(|product| match item.variant_id {
    Some(variant_id) => product.variant(variant_id).is_some(),
    None => true,
  })
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn product(&self, product_id: Uuid) -> ShopResult<Option<Product>> {
    Ok(self.state.lock().products.get(&product_id).cloned())
  }
}

#[async_trait]
impl Carts for MemoryStore {
  async fn cart_items(&self, user_id: Uuid) -> ShopResult<Vec<CartItem>> {
    Ok(self.state.lock().carts.get(&user_id).cloned().unwrap_or_default())
  }
}

#[async_trait]
impl AddressBook for MemoryStore {
  async fn address(&self, user_id: Uuid, address_id: Uuid) -> ShopResult<Option<Address>> {
    let state = self.state.lock();
    Ok(
      state
        .addresses
        .iter()
        .find(|a| a.id == address_id && a.user_id == user_id)
        .cloned(),
    )
  }

  async fn default_address(&self, user_id: Uuid) -> ShopResult<Option<Address>> {
    let state = self.state.lock();
    Ok(state.addresses.iter().find(|a| a.user_id == user_id && a.is_default).cloned())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn place(&self, order: &Order, cart_items: &[PricedCartItem]) -> ShopResult<()> {
    let mut state = self.state.lock();
    if state.orders.iter().any(|o| o.id == order.id) {
      return Err(ShopError::Conflict(format!("Order {} already exists", order.id)));
    }

    let mut products = state.products.clone();
    for item in &order.items {
      adjust_stock(&mut products, item, -item.quantity)?;
    }

    let remaining = match order.checkout_type {
      CheckoutType::Cart => {
        let cart = state.carts.get(&order.user_id).map(Vec::as_slice).unwrap_or_default();
        let unchanged = cart_items
          .iter()
          .all(|priced| cart.iter().any(|row| row.id == priced.id && row.quantity == priced.quantity));
        if !unchanged {
          return Err(stale_cart());
        }
        let remaining: Vec<CartItem> = cart
          .iter()
          .filter(|row| !cart_items.iter().any(|priced| priced.id == row.id))
          .cloned()
          .collect();
        Some(remaining)
      }
      CheckoutType::BuyNow => None,
    };

    state.products = products;
    if let Some(remaining) = remaining {
      if remaining.is_empty() {
        state.carts.remove(&order.user_id);
      } else {
        state.carts.insert(order.user_id, remaining);
      }
    }
    state.orders.push(order.clone());
    Ok(())
  }

  async fn find(&self, order_id: Uuid) -> ShopResult<Option<Order>> {
    Ok(self.state.lock().orders.iter().find(|o| o.id == order_id).cloned())
  }

  async fn save_transition(&self, order: &Order, expected: OrderStatus, restock: bool) -> ShopResult<()> {
    let mut state = self.state.lock();
    let index = state
      .orders
      .iter()
      .position(|o| o.id == order.id)
      .ok_or_else(|| ShopError::NotFound("Order not found".to_string()))?;
    if state.orders.get(index).map(|o| o.status) != Some(expected) {
      return Err(ShopError::Conflict(
        "Order status was changed by another request".to_string(),
      ));
    }

    if restock {
      let mut products = state.products.clone();
      for item in &order.items {
        // Products or variants deleted since checkout have nothing to restock.
        if !has_stock_slot(&products, item) {
          warn!(product_id = %item.product_id, variant_id = ?item.variant_id, "Restock skipped; item no longer in catalog.");
          continue;
        }
        adjust_stock(&mut products, item, item.quantity)?;
      }
      state.products = products;
    }

    if let Some(stored) = state.orders.get_mut(index) {
      *stored = order.clone();
    }
    Ok(())
  }

  async fn orders_for_user(&self, user_id: Uuid) -> ShopResult<Vec<Order>> {
    let state = self.state.lock();
    Ok(state.orders.iter().rev().filter(|o| o.user_id == user_id).cloned().collect())
  }

  async fn list(&self, filter: &OrderFilter) -> ShopResult<OrderPage> {
    let state = self.state.lock();
    let matching: Vec<&Order> = state
      .orders
      .iter()
      .rev()
      .filter(|o| filter.status.map_or(true, |s| o.status == s))
      .collect();
    let total = matching.len() as u64;
    let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
    let orders = matching
      .into_iter()
      .skip(offset)
      .take(filter.limit as usize)
      .cloned()
      .collect();
    Ok(OrderPage::new(orders, total, filter))
  }
}

// shopfront_app/src/db/mod.rs

//! Postgres implementations of the core storage ports.

pub mod rows;

use async_trait::async_trait;
use shopfront::model::{Address, CartItem, CheckoutType, Order, OrderItem, OrderStatus, Product, StatusHistoryEntry};
use shopfront::store::stale_cart;
use shopfront::{
  AddressBook, Carts, Catalog, OrderFilter, OrderPage, OrderStore, PricedCartItem, ShopError, ShopResult,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use rows::{AddressRow, CartItemRow, HistoryRow, OrderItemRow, OrderRow, ProductRow, VariantRow};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(config: &AppConfig) -> AppResult<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .connect(&config.database_url)
    .await?;
  info!("Successfully connected to the database.");

  if config.run_migrations {
    MIGRATOR.run(&pool).await?;
    info!("Database migrations applied.");
  }
  Ok(pool)
}

const ORDER_COLUMNS: &str = "id, user_id, checkout_type, subtotal_cents, discount_cents, shipping_cents, total_cents, \
  total_weight_grams, courier_name, estimated_delivery_days, shipping_address, payment_mode, payment_status, \
  coupon_code, status, delivered_at, cancellation_reason, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
  "id, user_id, full_name, phone, line1, line2, city, state, postal_code, country, is_default";

fn db_err(err: sqlx::Error) -> ShopError {
  ShopError::storage(err)
}

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Attaches items and history to order rows, keeping the rows' order.
  async fn hydrate(&self, order_rows: Vec<OrderRow>) -> ShopResult<Vec<Order>> {
    if order_rows.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = order_rows.iter().map(|r| r.id).collect();

    let item_rows: Vec<OrderItemRow> = sqlx::query_as(
      "SELECT order_id, product_id, variant_id, name, color, size, unit_price_cents, discount_percent, \
       final_unit_price_cents, quantity, line_subtotal_cents, line_discount_cents, weight_grams, dimensions \
       FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    let history_rows: Vec<HistoryRow> = sqlx::query_as(
      "SELECT order_id, from_status, status, changed_at, actor_role, actor_user_id, reason \
       FROM order_status_history WHERE order_id = ANY($1) ORDER BY order_id, id",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
      items.entry(row.order_id).or_default().push(OrderItem::from(row));
    }
    let mut history: HashMap<Uuid, Vec<StatusHistoryEntry>> = HashMap::new();
    for row in history_rows {
      let order_id = row.order_id;
      history.entry(order_id).or_default().push(StatusHistoryEntry::try_from(row)?);
    }

    order_rows
      .into_iter()
      .map(|row| {
        let id = row.id;
        row.into_order(
          items.remove(&id).unwrap_or_default(),
          history.remove(&id).unwrap_or_default(),
        )
      })
      .collect()
  }
}

async fn insert_history(
  tx: &mut Transaction<'_, Postgres>,
  order_id: Uuid,
  entry: &StatusHistoryEntry,
) -> ShopResult<()> {
  sqlx::query(
    "INSERT INTO order_status_history (order_id, from_status, status, changed_at, actor_role, actor_user_id, reason) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)",
  )
  .bind(order_id)
  .bind(entry.from.map(OrderStatus::as_str))
  .bind(entry.status.as_str())
  .bind(entry.changed_at)
  .bind(entry.actor.role.as_str())
  .bind(entry.actor.user_id)
  .bind(&entry.reason)
  .execute(&mut **tx)
  .await
  .map_err(db_err)?;
  Ok(())
}

/// Moves stock for one line by `delta`. A decrement only applies while enough
/// stock is left; the return value says whether the row changed.
async fn adjust_stock(tx: &mut Transaction<'_, Postgres>, item: &OrderItem, delta: i32) -> ShopResult<bool> {
  let query = match item.variant_id {
    Some(variant_id) => sqlx::query(
      "UPDATE product_variants SET stock = stock + $1 WHERE id = $2 AND product_id = $3 AND stock + $1 >= 0",
    )
    .bind(delta)
    .bind(variant_id)
    .bind(item.product_id),
    None => sqlx::query("UPDATE products SET stock = stock + $1, updated_at = now() WHERE id = $2 AND stock + $1 >= 0")
      .bind(delta)
      .bind(item.product_id),
  };
  let result = query.execute(&mut **tx).await.map_err(db_err)?;
  Ok(result.rows_affected() == 1)
}

#[async_trait]
impl Catalog for PgStore {
  async fn product(&self, product_id: Uuid) -> ShopResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(
      "SELECT id, name, price_cents, discount_percent, offer_starts_at, offer_ends_at, stock, is_blacklisted, \
       weight_grams, length_cm, breadth_cm, height_cm FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)?;
    let Some(row) = row else { return Ok(None) };

    let variants: Vec<VariantRow> =
      sqlx::query_as("SELECT id, color, size, price_cents, stock FROM product_variants WHERE product_id = $1")
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
    Ok(Some(row.into_product(variants)))
  }
}

#[async_trait]
impl Carts for PgStore {
  async fn cart_items(&self, user_id: Uuid) -> ShopResult<Vec<CartItem>> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
      "SELECT id, user_id, product_id, variant_id, color, size, quantity, unit_price_cents, added_at \
       FROM cart_items WHERE user_id = $1 ORDER BY added_at, id",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(rows.into_iter().map(CartItem::from).collect())
  }
}

#[async_trait]
impl AddressBook for PgStore {
  async fn address(&self, user_id: Uuid, address_id: Uuid) -> ShopResult<Option<Address>> {
    let row: Option<AddressRow> =
      sqlx::query_as(&format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"))
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
    Ok(row.map(Address::from))
  }

  async fn default_address(&self, user_id: Uuid) -> ShopResult<Option<Address>> {
    let row: Option<AddressRow> = sqlx::query_as(&format!(
      "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 AND is_default ORDER BY id LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(row.map(Address::from))
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "PgStore::place", skip(self, order, cart_items), fields(order_id = %order.id), err(Display))]
  async fn place(&self, order: &Order, cart_items: &[PricedCartItem]) -> ShopResult<()> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    // Dropping `tx` on any early return rolls everything back.
    for item in &order.items {
      if !adjust_stock(&mut tx, item, -item.quantity).await? {
        warn!(product_id = %item.product_id, quantity = item.quantity, "Stock ran out at commit.");
        return Err(ShopError::OutOfStock {
          product_id: item.product_id,
          name: item.name.clone(),
        });
      }
    }

    sqlx::query(&format!(
      "INSERT INTO orders ({ORDER_COLUMNS}) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.checkout_type.as_str())
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.shipping_cents)
    .bind(order.total_cents)
    .bind(order.total_weight_grams)
    .bind(&order.courier_name)
    .bind(order.estimated_delivery_days.and_then(|d| i32::try_from(d).ok()))
    .bind(Json(&order.shipping_address))
    .bind(order.payment_mode.as_str())
    .bind(order.payment_status.as_str())
    .bind(&order.coupon_code)
    .bind(order.status.as_str())
    .bind(order.delivered_at)
    .bind(&order.cancellation_reason)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    for (position, item) in order.items.iter().enumerate() {
      sqlx::query(
        "INSERT INTO order_items (order_id, position, product_id, variant_id, name, color, size, unit_price_cents, \
         discount_percent, final_unit_price_cents, quantity, line_subtotal_cents, line_discount_cents, weight_grams, \
         dimensions) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
      )
      .bind(order.id)
      .bind(i32::try_from(position).unwrap_or(i32::MAX))
      .bind(item.product_id)
      .bind(item.variant_id)
      .bind(&item.name)
      .bind(&item.color)
      .bind(&item.size)
      .bind(item.unit_price_cents)
      .bind(i16::from(item.discount_percent))
      .bind(item.final_unit_price_cents)
      .bind(item.quantity)
      .bind(item.line_subtotal_cents)
      .bind(item.line_discount_cents)
      .bind(item.weight_grams)
      .bind(item.dimensions.map(Json))
      .execute(&mut *tx)
      .await
      .map_err(db_err)?;
    }

    for entry in &order.status_history {
      insert_history(&mut tx, order.id, entry).await?;
    }

    if order.checkout_type == CheckoutType::Cart && !cart_items.is_empty() {
      let ids: Vec<Uuid> = cart_items.iter().map(|c| c.id).collect();
      let quantities: Vec<i32> = cart_items.iter().map(|c| c.quantity).collect();
      // Only rows still matching what was priced; anything added later stays.
      let deleted = sqlx::query(
        "DELETE FROM cart_items c USING UNNEST($2::UUID[], $3::INTEGER[]) AS priced (id, quantity) \
         WHERE c.user_id = $1 AND c.id = priced.id AND c.quantity = priced.quantity",
      )
      .bind(order.user_id)
      .bind(&ids)
      .bind(&quantities)
      .execute(&mut *tx)
      .await
      .map_err(db_err)?;

      if deleted.rows_affected() != cart_items.len() as u64 {
        warn!(
          priced = cart_items.len(),
          matched = deleted.rows_affected(),
          "Cart changed between pricing and commit."
        );
        return Err(stale_cart());
      }
    }

    tx.commit().await.map_err(db_err)
  }

  async fn find(&self, order_id: Uuid) -> ShopResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    let Some(row) = row else { return Ok(None) };
    Ok(self.hydrate(vec![row]).await?.pop())
  }

  #[instrument(name = "PgStore::save_transition", skip(self, order), fields(order_id = %order.id, to = %order.status), err(Display))]
  async fn save_transition(&self, order: &Order, expected: OrderStatus, restock: bool) -> ShopResult<()> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    let updated = sqlx::query(
      "UPDATE orders SET status = $1, payment_status = $2, delivered_at = $3, cancellation_reason = $4, \
       updated_at = $5 WHERE id = $6 AND status = $7",
    )
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.delivered_at)
    .bind(&order.cancellation_reason)
    .bind(order.updated_at)
    .bind(order.id)
    .bind(expected.as_str())
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    if updated.rows_affected() == 0 {
      let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
        .bind(order.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
      return Err(match exists {
        Some(_) => ShopError::Conflict("Order status was changed by another request".to_string()),
        None => ShopError::NotFound("Order not found".to_string()),
      });
    }

    if let Some(entry) = order.status_history.last() {
      insert_history(&mut tx, order.id, entry).await?;
    }

    if restock {
      for item in &order.items {
        if !adjust_stock(&mut tx, item, item.quantity).await? {
          warn!(product_id = %item.product_id, variant_id = ?item.variant_id, "Restock skipped; item no longer in catalog.");
        }
      }
    }

    tx.commit().await.map_err(db_err)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> ShopResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;
    self.hydrate(rows).await
  }

  async fn list(&self, filter: &OrderFilter) -> ShopResult<OrderPage> {
    let status = filter.status.map(OrderStatus::as_str);

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
      .bind(status)
      .fetch_one(&self.pool)
      .await
      .map_err(db_err)?;

    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::TEXT IS NULL OR status = $1) \
       ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(status)
    .bind(i64::from(filter.limit))
    .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    let orders = self.hydrate(rows).await?;
    Ok(OrderPage::new(orders, u64::try_from(total).unwrap_or(0), filter))
  }
}

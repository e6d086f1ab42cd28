// shopfront/src/orders/mod.rs

//! Order workflows: placement, status changes, cancellation and lookups.

pub mod placement;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::calculator::{OrderCalculator, OrderQuote, QuoteRequest};
use crate::error::{ShopError, ShopResult};
use crate::model::{Actor, ActorRole, Order, OrderStatus, PaymentMode};
use crate::pipeline::ContextData;
use crate::shipping::ShipmentRegistrar;
use crate::status::{self, TransitionOutcome};
use crate::store::{OrderFilter, OrderPage, OrderStore};

use placement::{build_placement_pipeline, PlacementCtx, PlacementPipeline};

/// Checkout input. Without `product_id` the buyer's cart is ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
  pub address_id: Option<Uuid>,
  pub product_id: Option<Uuid>,
  pub variant_id: Option<Uuid>,
  pub quantity: Option<i32>,
  pub coupon_code: Option<String>,
  #[serde(default)]
  pub payment_mode: PaymentMode,
}

pub struct OrderService {
  calculator: OrderCalculator,
  orders: Arc<dyn OrderStore>,
  placement: PlacementPipeline,
}

impl std::fmt::Debug for OrderService {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderService")
      .field("calculator", &self.calculator)
      .field("placement", &self.placement)
      .finish_non_exhaustive()
  }
}

fn require_staff(actor: Actor) -> ShopResult<()> {
  match actor.role {
    ActorRole::Admin | ActorRole::System => Ok(()),
    ActorRole::Customer => Err(ShopError::Forbidden("Admin access required".to_string())),
  }
}

impl OrderService {
  pub fn new(
    calculator: OrderCalculator,
    orders: Arc<dyn OrderStore>,
    registrar: Option<Arc<dyn ShipmentRegistrar>>,
  ) -> ShopResult<Self> {
    let placement = build_placement_pipeline(calculator.clone(), orders.clone(), registrar)?;
    Ok(Self {
      calculator,
      orders,
      placement,
    })
  }

  /// Checkout preview. Writes nothing.
  pub async fn quote(&self, user_id: Uuid, request: &QuoteRequest) -> ShopResult<OrderQuote> {
    self.calculator.calculate(user_id, request).await
  }

  pub async fn place_order(&self, user_id: Uuid, request: PlaceOrderRequest) -> ShopResult<Order> {
    self.place_order_at(user_id, request, Utc::now()).await
  }

  #[instrument(name = "OrderService::place_order", skip(self, request), err(Display))]
  pub async fn place_order_at(&self, user_id: Uuid, request: PlaceOrderRequest, now: DateTime<Utc>) -> ShopResult<Order> {
    let ctx = ContextData::new(PlacementCtx::new(user_id, request, now));
    self.placement.run(ctx.clone()).await?;

    let mut guard = ctx.write();
    if !guard.committed {
      return Err(ShopError::Internal("Order placement stopped before commit".to_string()));
    }
    guard
      .order
      .take()
      .ok_or_else(|| ShopError::Internal("Order placement finished without an order".to_string()))
  }

  /// Staff-driven status change. Cancelling puts every line back into stock.
  #[instrument(name = "OrderService::update_status", skip(self, reason), fields(actor = actor.role.as_str()), err(Display))]
  pub async fn update_status(
    &self,
    actor: Actor,
    order_id: Uuid,
    to: OrderStatus,
    reason: Option<&str>,
  ) -> ShopResult<Order> {
    require_staff(actor)?;
    let order = self.load(order_id).await?;
    self.transition(order, to, actor, reason).await
  }

  /// Buyer-initiated cancellation of their own, not yet shipped, order.
  #[instrument(name = "OrderService::cancel_order", skip(self, reason), err(Display))]
  pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid, reason: &str) -> ShopResult<Order> {
    let reason = reason.trim();
    if reason.is_empty() {
      return Err(ShopError::Validation("Cancellation reason is required".to_string()));
    }

    let order = self.load(order_id).await?;
    if order.user_id != user_id {
      return Err(ShopError::Forbidden("You can only cancel your own orders".to_string()));
    }

    let refusal = match order.status {
      OrderStatus::Placed | OrderStatus::Confirmed | OrderStatus::Packed => None,
      OrderStatus::Shipped => Some("Order can no longer be cancelled".to_string()),
      OrderStatus::Cancelled => Some("Order is already cancelled".to_string()),
      from => status::validate(from, OrderStatus::Cancelled).message,
    };
    if let Some(message) = refusal {
      return Err(ShopError::InvalidTransition {
        from: order.status,
        to: OrderStatus::Cancelled,
        message,
      });
    }

    self
      .transition(order, OrderStatus::Cancelled, Actor::customer(user_id), Some(reason))
      .await
  }

  pub async fn orders_for_user(&self, user_id: Uuid) -> ShopResult<Vec<Order>> {
    self.orders.orders_for_user(user_id).await
  }

  pub async fn all_orders(&self, actor: Actor, filter: OrderFilter) -> ShopResult<OrderPage> {
    require_staff(actor)?;
    self.orders.list(&filter.normalized()).await
  }

  /// One order, visible to its owner and to staff.
  pub async fn order(&self, viewer: Actor, order_id: Uuid) -> ShopResult<Order> {
    let order = self.load(order_id).await?;
    match viewer.role {
      ActorRole::Admin | ActorRole::System => Ok(order),
      ActorRole::Customer if viewer.user_id == Some(order.user_id) => Ok(order),
      ActorRole::Customer => Err(ShopError::Forbidden("You are not allowed to view this order".to_string())),
    }
  }

  async fn load(&self, order_id: Uuid) -> ShopResult<Order> {
    self
      .orders
      .find(order_id)
      .await?
      .ok_or_else(|| ShopError::NotFound("Order not found".to_string()))
  }

  async fn transition(&self, mut order: Order, to: OrderStatus, actor: Actor, reason: Option<&str>) -> ShopResult<Order> {
    let expected = order.status;
    match status::apply_transition(&mut order, to, actor, reason, Utc::now())? {
      TransitionOutcome::Unchanged => Ok(order),
      TransitionOutcome::Applied { to, .. } => {
        let restock = to == OrderStatus::Cancelled;
        self.orders.save_transition(&order, expected, restock).await?;
        if restock {
          info!(order_id = %order.id, lines = order.items.len(), "Stock restored for cancelled order.");
        }
        Ok(order)
      }
    }
  }
}

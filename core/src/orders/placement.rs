// shopfront/src/orders/placement.rs

//! The order placement pipeline: quote, assemble, commit, register with the
//! carrier. Each step runs in its own span. Carrier registration is handed to
//! a background task, so the order never waits on the carrier.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::PlaceOrderRequest;
use crate::calculator::{OrderCalculator, OrderQuote, QuoteRequest};
use crate::error::{PipelineError, ShopError};
use crate::model::{Actor, Order, OrderItem, OrderStatus, PaymentStatus, StatusHistoryEntry};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};
use crate::shipping::ShipmentRegistrar;
use crate::store::OrderStore;

pub const CALCULATE_QUOTE: &str = "calculate_quote";
pub const ASSEMBLE_ORDER: &str = "assemble_order";
pub const COMMIT_ORDER: &str = "commit_order";
pub const REGISTER_SHIPMENT: &str = "register_shipment";

/// Shared state of one placement run.
#[derive(Debug, Clone)]
pub struct PlacementCtx {
  pub user_id: Uuid,
  pub request: PlaceOrderRequest,
  pub now: DateTime<Utc>,
  pub quote: Option<OrderQuote>,
  pub order: Option<Order>,
  pub committed: bool,
}

impl PlacementCtx {
  pub fn new(user_id: Uuid, request: PlaceOrderRequest, now: DateTime<Utc>) -> Self {
    PlacementCtx {
      user_id,
      request,
      now,
      quote: None,
      order: None,
      committed: false,
    }
  }
}

pub type PlacementPipeline = Pipeline<PlacementCtx, ShopError>;

fn missing(what: &str) -> ShopError {
  ShopError::Internal(format!("{what} missing from placement context"))
}

/// Builds the order out of a quote. Everything the order records comes from
/// the quote, so what the buyer saw is what gets stored.
pub fn assemble_order(user_id: Uuid, request: &PlaceOrderRequest, quote: &OrderQuote, now: DateTime<Utc>) -> Result<Order, ShopError> {
  let shipping_address = quote
    .address
    .clone()
    .ok_or_else(|| ShopError::Validation("Shipping address is required".to_string()))?;

  let coupon_code = request
    .coupon_code
    .as_deref()
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .map(str::to_string);

  let summary = quote.summary;
  Ok(Order {
    id: Uuid::new_v4(),
    user_id,
    checkout_type: quote.checkout_type,
    items: quote.items.iter().map(OrderItem::from).collect(),
    subtotal_cents: summary.subtotal_cents,
    discount_cents: summary.discount_cents,
    shipping_cents: summary.shipping_cents,
    total_cents: summary.total_cents,
    total_weight_grams: summary.total_weight_grams,
    courier_name: quote.courier.as_ref().map(|c| c.courier_name.clone()),
    estimated_delivery_days: quote.courier.as_ref().and_then(|c| c.estimated_delivery_days),
    shipping_address,
    payment_mode: request.payment_mode,
    payment_status: PaymentStatus::Pending,
    coupon_code,
    status: OrderStatus::Placed,
    status_history: vec![StatusHistoryEntry {
      from: None,
      status: OrderStatus::Placed,
      changed_at: now,
      actor: Actor::customer(user_id),
      reason: OrderStatus::Placed.default_reason().to_string(),
    }],
    delivered_at: None,
    cancellation_reason: None,
    created_at: now,
    updated_at: now,
  })
}

pub fn build_placement_pipeline(
  calculator: OrderCalculator,
  orders: Arc<dyn OrderStore>,
  registrar: Option<Arc<dyn ShipmentRegistrar>>,
) -> Result<PlacementPipeline, PipelineError> {
  let not_committed: SkipCondition<PlacementCtx> = Arc::new(|ctx: ContextData<PlacementCtx>| !ctx.read().committed);

  let mut p = PlacementPipeline::new(&[
    (CALCULATE_QUOTE, false, None),
    (ASSEMBLE_ORDER, false, None),
    (COMMIT_ORDER, false, None),
    (REGISTER_SHIPMENT, true, Some(not_committed)),
  ]);

  p.on(CALCULATE_QUOTE, move |ctx: ContextData<PlacementCtx>| {
    let calculator = calculator.clone();
    async move {
      let (user_id, quote_request, now) = {
        let guard = ctx.read();
        let request = &guard.request;
        let quote_request = QuoteRequest {
          product_id: request.product_id,
          variant_id: request.variant_id,
          quantity: request.quantity,
          address_id: request.address_id,
          payment_mode: request.payment_mode,
        };
        (guard.user_id, quote_request, guard.now)
      };

      let quote = calculator.calculate_at(user_id, &quote_request, now).await?;
      ctx.write().quote = Some(quote);
      Ok::<_, ShopError>(PipelineControl::Continue)
    }
  })?;

  p.on(ASSEMBLE_ORDER, |ctx: ContextData<PlacementCtx>| async move {
    let mut guard = ctx.write();
    let quote = guard.quote.as_ref().ok_or_else(|| missing("quote"))?;
    let order = assemble_order(guard.user_id, &guard.request, quote, guard.now)?;
    guard.order = Some(order);
    Ok::<_, ShopError>(PipelineControl::Continue)
  })?;

  p.on(COMMIT_ORDER, move |ctx: ContextData<PlacementCtx>| {
    let orders = orders.clone();
    async move {
      let (order, cart_items) = {
        let guard = ctx.read();
        let order = guard.order.clone().ok_or_else(|| missing("order"))?;
        let quote = guard.quote.as_ref().ok_or_else(|| missing("quote"))?;
        (order, quote.priced_cart_items())
      };
      orders.place(&order, &cart_items).await?;
      ctx.write().committed = true;
      info!(order_id = %order.id, user_id = %order.user_id, total_cents = order.total_cents, "Order placed.");
      Ok::<_, ShopError>(PipelineControl::Continue)
    }
  })?;

  // No registrar means no handler, and an optional step without handlers is skipped.
  if let Some(registrar) = registrar {
    p.on(REGISTER_SHIPMENT, move |ctx: ContextData<PlacementCtx>| {
      let registrar = registrar.clone();
      async move {
        let order = ctx.read().order.clone().ok_or_else(|| missing("order"))?;
        let span = tracing::info_span!("register_shipment_task", order_id = %order.id);
        tokio::spawn(
          async move {
            match registrar.register(&order).await {
              Ok(receipt) => info!(
                carrier_order_id = %receipt.carrier_order_id,
                shipment_id = ?receipt.shipment_id,
                "Shipment registered."
              ),
              Err(e) => warn!(error = %e, "Shipment registration failed."),
            }
          }
          .instrument(span),
        );
        Ok::<_, ShopError>(PipelineControl::Continue)
      }
    })?;
  }

  Ok(p)
}

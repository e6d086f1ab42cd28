// shopfront/src/calculator.rs

//! Turns a cart, or a single "buy now" product, into a priced and shippable
//! quote. Nothing here writes; placing the order is `orders::OrderService`'s job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};
use crate::model::{Address, CheckoutType, Dimensions, OrderItem, PaymentMode, Product};
use crate::pricing::LinePricing;
use crate::shipping::{CourierRate, ShippingPolicy, ShippingRateEstimator, ShippingRateRequest};
use crate::store::{AddressBook, Carts, Catalog, PricedCartItem};

/// What to price. Without `product_id` the caller's cart is priced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
  pub product_id: Option<Uuid>,
  pub variant_id: Option<Uuid>,
  /// Buy-now quantity, 1 when absent.
  pub quantity: Option<i32>,
  pub address_id: Option<Uuid>,
  #[serde(default)]
  pub payment_mode: PaymentMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
  /// The cart row this line was priced from; absent for buy-now.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cart_item_id: Option<Uuid>,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub name: String,
  pub color: Option<String>,
  pub size: Option<String>,
  #[serde(flatten)]
  pub pricing: LinePricing,
  pub dimensions: Option<Dimensions>,
}

impl From<&QuoteLine> for OrderItem {
  fn from(line: &QuoteLine) -> Self {
    OrderItem {
      product_id: line.product_id,
      variant_id: line.variant_id,
      name: line.name.clone(),
      color: line.color.clone(),
      size: line.size.clone(),
      unit_price_cents: line.pricing.unit_price_cents,
      discount_percent: line.pricing.discount_percent,
      final_unit_price_cents: line.pricing.final_unit_price_cents,
      quantity: line.pricing.quantity,
      line_subtotal_cents: line.pricing.line_subtotal_cents,
      line_discount_cents: line.pricing.line_discount_cents,
      weight_grams: line.pricing.line_weight_grams,
      dimensions: line.dimensions,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub total_weight_grams: i64,
}

impl QuoteSummary {
  pub fn payable_cents(&self) -> i64 {
    self.subtotal_cents - self.discount_cents
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
  pub items: Vec<QuoteLine>,
  pub summary: QuoteSummary,
  pub checkout_type: CheckoutType,
  pub address: Option<Address>,
  /// Set when the shipping charge came from a live carrier rate.
  pub courier: Option<CourierRate>,
}

impl OrderQuote {
  /// Cart rows, with the quantities that were priced, that placing this
  /// quote consumes. Empty for buy-now.
  pub fn priced_cart_items(&self) -> Vec<PricedCartItem> {
    self
      .items
      .iter()
      .filter_map(|line| {
        line.cart_item_id.map(|id| PricedCartItem {
          id,
          quantity: line.pricing.quantity,
        })
      })
      .collect()
  }
}

struct LineRequest {
  cart_item_id: Option<Uuid>,
  product_id: Uuid,
  variant_id: Option<Uuid>,
  quantity: i32,
  color: Option<String>,
  size: Option<String>,
}

#[derive(Clone)]
pub struct OrderCalculator {
  catalog: Arc<dyn Catalog>,
  carts: Arc<dyn Carts>,
  addresses: Arc<dyn AddressBook>,
  estimator: Option<Arc<dyn ShippingRateEstimator>>,
  policy: ShippingPolicy,
}

impl std::fmt::Debug for OrderCalculator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderCalculator")
      .field("policy", &self.policy)
      .field("live_rates", &self.estimator.is_some())
      .finish_non_exhaustive()
  }
}

impl OrderCalculator {
  pub fn new(
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn Carts>,
    addresses: Arc<dyn AddressBook>,
    estimator: Option<Arc<dyn ShippingRateEstimator>>,
    policy: ShippingPolicy,
  ) -> Self {
    Self {
      catalog,
      carts,
      addresses,
      estimator,
      policy,
    }
  }

  pub fn policy(&self) -> &ShippingPolicy {
    &self.policy
  }

  pub async fn calculate(&self, user_id: Uuid, request: &QuoteRequest) -> ShopResult<OrderQuote> {
    self.calculate_at(user_id, request, Utc::now()).await
  }

  /// [`calculate`](Self::calculate) with an explicit clock, which decides
  /// whether offer windows are open.
  #[instrument(name = "OrderCalculator::calculate", skip(self, request), fields(buy_now = request.product_id.is_some()), err(Display))]
  pub async fn calculate_at(&self, user_id: Uuid, request: &QuoteRequest, now: DateTime<Utc>) -> ShopResult<OrderQuote> {
    let (checkout_type, line_requests) = self.line_requests(user_id, request).await?;

    let mut items = Vec::with_capacity(line_requests.len());
    for line in line_requests {
      items.push(self.price_line(line, checkout_type, now).await?);
    }

    let subtotal_cents: i64 = items.iter().map(|l| l.pricing.line_subtotal_cents).sum();
    let discount_cents: i64 = items.iter().map(|l| l.pricing.line_discount_cents).sum();
    let total_weight_grams: i64 = items.iter().map(|l| l.pricing.line_weight_grams).sum();
    let payable_cents = subtotal_cents - discount_cents;

    let address = self.resolve_address(user_id, request.address_id).await?;
    let (shipping_cents, courier) = self
      .shipping_for(address.as_ref(), total_weight_grams, payable_cents, request.payment_mode)
      .await;

    debug!(
      subtotal_cents,
      discount_cents, shipping_cents, total_weight_grams, "Quote calculated."
    );
    Ok(OrderQuote {
      items,
      summary: QuoteSummary {
        subtotal_cents,
        discount_cents,
        shipping_cents,
        total_cents: payable_cents + shipping_cents,
        total_weight_grams,
      },
      checkout_type,
      address,
      courier,
    })
  }

  async fn line_requests(&self, user_id: Uuid, request: &QuoteRequest) -> ShopResult<(CheckoutType, Vec<LineRequest>)> {
    if let Some(product_id) = request.product_id {
      let line = LineRequest {
        cart_item_id: None,
        product_id,
        variant_id: request.variant_id,
        quantity: request.quantity.unwrap_or(1),
        color: None,
        size: None,
      };
      return Ok((CheckoutType::BuyNow, vec![line]));
    }

    let cart = self.carts.cart_items(user_id).await?;
    if cart.is_empty() {
      return Err(ShopError::CartEmpty);
    }
    let lines = cart
      .into_iter()
      .map(|item| LineRequest {
        cart_item_id: Some(item.id),
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity: item.quantity,
        color: item.color,
        size: item.size,
      })
      .collect();
    Ok((CheckoutType::Cart, lines))
  }

  async fn price_line(&self, line: LineRequest, checkout_type: CheckoutType, now: DateTime<Utc>) -> ShopResult<QuoteLine> {
    if line.quantity < 1 {
      return Err(ShopError::Validation("Quantity must be at least 1".to_string()));
    }

    let product: Product = match self.catalog.product(line.product_id).await? {
      Some(product) => product,
      None if checkout_type == CheckoutType::BuyNow => {
        return Err(ShopError::NotFound("Product not found".to_string()));
      }
      None => {
        return Err(ShopError::ProductUnavailable(format!(
          "{} is no longer available",
          line.product_id
        )));
      }
    };
    if product.is_blacklisted {
      return Err(ShopError::ProductUnavailable(format!("{} is not available", product.name)));
    }

    let variant = match line.variant_id {
      Some(variant_id) => Some(product.variant(variant_id).ok_or_else(|| {
        ShopError::ProductUnavailable(format!("Selected option of {} is not available", product.name))
      })?),
      None => None,
    };

    if line.quantity > product.stock_for(variant) {
      return Err(ShopError::OutOfStock {
        product_id: product.id,
        name: product.name.clone(),
      });
    }

    let pricing = LinePricing::for_line(&product, variant, line.quantity, now);
    Ok(QuoteLine {
      cart_item_id: line.cart_item_id,
      product_id: product.id,
      variant_id: variant.map(|v| v.id),
      color: line.color.or_else(|| variant.and_then(|v| v.color.clone())),
      size: line.size.or_else(|| variant.and_then(|v| v.size.clone())),
      name: product.name,
      pricing,
      dimensions: product.dimensions,
    })
  }

  async fn resolve_address(&self, user_id: Uuid, address_id: Option<Uuid>) -> ShopResult<Option<Address>> {
    match address_id {
      Some(address_id) => self
        .addresses
        .address(user_id, address_id)
        .await?
        .map(Some)
        .ok_or_else(|| ShopError::NotFound("Address not found".to_string())),
      None => self.addresses.default_address(user_id).await,
    }
  }

  /// Live carrier rate when possible, otherwise the flat policy. Never fails.
  async fn shipping_for(
    &self,
    address: Option<&Address>,
    weight_grams: i64,
    payable_cents: i64,
    payment_mode: PaymentMode,
  ) -> (i64, Option<CourierRate>) {
    let flat = self.policy.flat_rate_cents(payable_cents);

    let (Some(estimator), Some(destination)) = (&self.estimator, address.and_then(Address::deliverable_postal_code))
    else {
      return (flat, None);
    };
    if weight_grams <= 0 {
      return (flat, None);
    }

    let request = ShippingRateRequest {
      origin_postcode: self.policy.origin_postcode.clone(),
      destination_postcode: destination.to_string(),
      weight_grams,
      cash_on_delivery: payment_mode.is_cod(),
    };
    match estimator.estimate(&request).await {
      Ok(quote) => match quote.select_courier() {
        Some(courier) => (courier.rate_cents, Some(courier.clone())),
        None => {
          warn!(destination, "No courier serves this destination; using flat shipping.");
          (flat, None)
        }
      },
      Err(e) => {
        warn!(error = %e, destination, "Shipping rate lookup failed; using flat shipping.");
        (flat, None)
      }
    }
  }
}

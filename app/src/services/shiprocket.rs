// shopfront_app/src/services/shiprocket.rs

//! Shiprocket carrier client: serviceability rates and ad-hoc order
//! registration. Built once at start-up and shared through `AppState`.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopfront::model::Order;
use shopfront::{
  CourierRate, RateQuote, ShipmentReceipt, ShipmentRegistrar, ShippingRateEstimator, ShippingRateRequest, ShopError,
  ShopResult,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::ShiprocketConfig;

#[derive(Debug, Error)]
pub enum ShiprocketError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{0}")]
  UnexpectedResponse(String),
}

impl From<ShiprocketError> for ShopError {
  fn from(err: ShiprocketError) -> Self {
    ShopError::shipping(err)
  }
}

#[derive(Debug)]
pub struct ShiprocketClient {
  config: ShiprocketConfig,
  http: Client,
  token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
  token: String,
}

#[derive(Debug, Deserialize)]
struct ServiceabilityResponse {
  #[serde(default)]
  data: Option<ServiceabilityData>,
}

#[derive(Debug, Deserialize)]
struct ServiceabilityData {
  #[serde(default)]
  available_courier_companies: Vec<CourierCompany>,
  recommended_courier_company_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CourierCompany {
  courier_company_id: i64,
  courier_name: String,
  /// Rupees, fractional.
  rate: f64,
  #[serde(default)]
  estimated_delivery_days: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
  order_id: Option<serde_json::Value>,
  shipment_id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct AdhocOrderItem<'a> {
  name: &'a str,
  sku: String,
  units: i32,
  selling_price: f64,
  discount: f64,
}

fn cents_to_rupees(cents: i64) -> f64 {
  cents as f64 / 100.0
}

fn rupees_to_cents(rupees: f64) -> i64 {
  (rupees * 100.0).round() as i64
}

/// Shiprocket sends ids and day counts as numbers or strings.
fn loose_string(value: &serde_json::Value) -> Option<String> {
  match value {
    serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    serde_json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

impl CourierCompany {
  fn into_rate(self) -> CourierRate {
    CourierRate {
      courier_id: self.courier_company_id,
      courier_name: self.courier_name,
      rate_cents: rupees_to_cents(self.rate),
      estimated_delivery_days: self
        .estimated_delivery_days
        .as_ref()
        .and_then(loose_string)
        .and_then(|d| d.parse::<u32>().ok()),
    }
  }
}

impl ShiprocketClient {
  pub fn new(config: ShiprocketConfig) -> Result<Self, ShiprocketError> {
    let http = Client::builder().timeout(config.request_timeout).build()?;
    Ok(Self {
      config,
      http,
      token: RwLock::new(None),
    })
  }

  async fn login(&self) -> Result<String, ShiprocketError> {
    let url = format!("{}/v1/external/auth/login", self.config.base_url);
    let response = self
      .http
      .post(&url)
      .json(&json!({ "email": self.config.email, "password": self.config.password }))
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      return Err(ShiprocketError::UnexpectedResponse(format!(
        "login failed with status {status}"
      )));
    }

    let parsed: LoginResponse = response.json().await?;
    *self.token.write() = Some(parsed.token.clone());
    info!("Shiprocket token refreshed.");
    Ok(parsed.token)
  }

  async fn token(&self) -> Result<String, ShiprocketError> {
    let cached = self.token.read().clone();
    match cached {
      Some(token) => Ok(token),
      None => self.login().await,
    }
  }

  /// Sends an authenticated request, logging in again once if the cached
  /// token was rejected.
  async fn send_authorized(
    &self,
    build: impl Fn(&str) -> reqwest::RequestBuilder + Send + Sync,
  ) -> Result<reqwest::Response, ShiprocketError> {
    let token = self.token().await?;
    let response = build(&token).send().await?;
    if response.status() != StatusCode::UNAUTHORIZED {
      return Ok(response);
    }

    debug!("Shiprocket token rejected; logging in again.");
    *self.token.write() = None;
    let token = self.login().await?;
    Ok(build(&token).send().await?)
  }

  fn adhoc_order_body(&self, order: &Order) -> serde_json::Value {
    let address = &order.shipping_address;
    let items: Vec<AdhocOrderItem<'_>> = order
      .items
      .iter()
      .map(|item| AdhocOrderItem {
        name: &item.name,
        sku: item.variant_id.unwrap_or(item.product_id).simple().to_string(),
        units: item.quantity,
        selling_price: cents_to_rupees(item.unit_price_cents),
        discount: cents_to_rupees(item.unit_price_cents - item.final_unit_price_cents),
      })
      .collect();

    // Parcel size follows the largest item.
    let (length, breadth, height) = order
      .items
      .iter()
      .filter_map(|i| i.dimensions)
      .fold((10, 10, 10), |(l, b, h), d| {
        (l.max(d.length_cm), b.max(d.breadth_cm), h.max(d.height_cm))
      });

    json!({
      "order_id": order.id.simple().to_string(),
      "order_date": order.created_at.format("%Y-%m-%d %H:%M").to_string(),
      "pickup_location": self.config.pickup_location,
      "billing_customer_name": address.full_name,
      "billing_last_name": "",
      "billing_address": address.line1,
      "billing_address_2": address.line2.clone().unwrap_or_default(),
      "billing_city": address.city,
      "billing_pincode": address.postal_code,
      "billing_state": address.state,
      "billing_country": address.country,
      "billing_email": "",
      "billing_phone": address.phone,
      "shipping_is_billing": true,
      "order_items": items,
      "payment_method": if order.payment_mode.is_cod() { "COD" } else { "Prepaid" },
      "shipping_charges": cents_to_rupees(order.shipping_cents),
      "total_discount": cents_to_rupees(order.discount_cents),
      "sub_total": cents_to_rupees(order.subtotal_cents - order.discount_cents),
      "length": length,
      "breadth": breadth,
      "height": height,
      "weight": (order.total_weight_grams.max(1) as f64) / 1000.0,
    })
  }
}

#[async_trait]
impl ShippingRateEstimator for ShiprocketClient {
  #[instrument(name = "Shiprocket::estimate", skip(self, request), fields(destination = %request.destination_postcode), err(Display))]
  async fn estimate(&self, request: &ShippingRateRequest) -> ShopResult<RateQuote> {
    let url = format!("{}/v1/external/courier/serviceability/", self.config.base_url);
    let weight_kg = (request.weight_grams.max(1) as f64 / 1000.0).to_string();
    let cod = if request.cash_on_delivery { "1" } else { "0" };

    let response = self
      .send_authorized(|token| {
        self.http.get(&url).bearer_auth(token).query(&[
          ("pickup_postcode", request.origin_postcode.as_str()),
          ("delivery_postcode", request.destination_postcode.as_str()),
          ("weight", weight_kg.as_str()),
          ("cod", cod),
        ])
      })
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      return Err(
        ShiprocketError::UnexpectedResponse(format!("serviceability failed with status {status}: {text}")).into(),
      );
    }

    let parsed: ServiceabilityResponse = response.json().await.map_err(ShiprocketError::from)?;
    let Some(data) = parsed.data else {
      return Ok(RateQuote::default());
    };
    Ok(RateQuote {
      couriers: data
        .available_courier_companies
        .into_iter()
        .map(CourierCompany::into_rate)
        .collect(),
      recommended_courier_id: data.recommended_courier_company_id,
    })
  }
}

#[async_trait]
impl ShipmentRegistrar for ShiprocketClient {
  #[instrument(name = "Shiprocket::register", skip(self, order), fields(order_id = %order.id), err(Display))]
  async fn register(&self, order: &Order) -> ShopResult<ShipmentReceipt> {
    let url = format!("{}/v1/external/orders/create/adhoc", self.config.base_url);
    let body = self.adhoc_order_body(order);

    let response = self
      .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&body))
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      return Err(
        ShiprocketError::UnexpectedResponse(format!("order creation failed with status {status}: {text}")).into(),
      );
    }

    let parsed: CreateOrderResponse = response.json().await.map_err(ShiprocketError::from)?;
    let carrier_order_id = parsed
      .order_id
      .as_ref()
      .and_then(loose_string)
      .ok_or_else(|| ShiprocketError::UnexpectedResponse("order creation returned no order_id".to_string()))?;
    Ok(ShipmentReceipt {
      carrier_order_id,
      shipment_id: parsed.shipment_id.as_ref().and_then(loose_string),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn courier_company_converts_rupees_and_loose_days() {
    let company: CourierCompany = serde_json::from_value(json!({
      "courier_company_id": 24,
      "courier_name": "Xpressbees Surface",
      "rate": 87.5,
      "estimated_delivery_days": "5"
    }))
    .unwrap();
    let rate = company.into_rate();
    assert_eq!(rate.rate_cents, 8_750);
    assert_eq!(rate.estimated_delivery_days, Some(5));
  }

  #[test]
  fn serviceability_without_data_is_empty() {
    let parsed: ServiceabilityResponse = serde_json::from_value(json!({ "status": 404 })).unwrap();
    assert!(parsed.data.is_none());
  }

  #[test]
  fn loose_ids_accept_numbers_and_strings() {
    assert_eq!(loose_string(&json!(12345)), Some("12345".to_string()));
    assert_eq!(loose_string(&json!(" 77 ")), Some("77".to_string()));
    assert_eq!(loose_string(&json!(null)), None);
  }
}

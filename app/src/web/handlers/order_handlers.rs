// shopfront_app/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopfront::model::OrderStatus;
use shopfront::{OrderFilter, PlaceOrderRequest, QuoteRequest};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
  #[serde(default)]
  pub status: String,
  pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderPayload {
  pub order_id: Uuid,
  #[serde(default)]
  pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub status: Option<String>,
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
  if raw.trim().is_empty() {
    return Err(AppError::Validation("Status is required".to_string()));
  }
  raw.parse().map_err(|e: shopfront::model::UnknownStatus| AppError::Validation(e.to_string()))
}

impl ListOrdersQuery {
  fn into_filter(self) -> AppResult<OrderFilter> {
    let defaults = OrderFilter::default();
    let status = match self.status.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(raw) => Some(parse_status(raw)?),
    };
    Ok(OrderFilter {
      page: self.page.unwrap_or(defaults.page),
      limit: self.limit.unwrap_or(defaults.limit),
      status,
    })
  }
}

#[instrument(name = "handler::quote_order", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn quote_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<QuoteRequest>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let quote = app_state.orders.quote(auth_user.user_id, &payload).await?;
  Ok(HttpResponse::Ok().json(json!({ "quote": quote })))
}

#[instrument(name = "handler::create_order", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PlaceOrderRequest>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let order = app_state
    .orders
    .place_order(auth_user.user_id, payload.into_inner())
    .await?;
  info!(order_id = %order.id, total_cents = order.total_cents, "Order created.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Order placed successfully",
    "order": order,
  })))
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %order_id)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  payload: web::Json<UpdateStatusPayload>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  if !auth_user.is_admin {
    return Err(AppError::Forbidden("Admin access required".to_string()));
  }
  let payload = payload.into_inner();
  let to = parse_status(&payload.status)?;

  let order = app_state
    .orders
    .update_status(auth_user.actor(), order_id.into_inner(), to, payload.reason.as_deref())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": format!("Order status updated to {}", order.status),
    "order": order,
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CancelOrderPayload>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let order = app_state
    .orders
    .cancel_order(auth_user.user_id, payload.order_id, &payload.reason)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order cancelled",
    "order": order,
  })))
}

#[instrument(name = "handler::orders_by_user", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn orders_by_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let orders = app_state.orders.orders_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::all_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn all_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let filter = query.into_inner().into_filter()?;
  let page = app_state.orders.all_orders(auth_user.actor(), filter).await?;
  Ok(HttpResponse::Ok().json(page))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, order_id = %order_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let order = app_state.orders.order(auth_user.actor(), order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_query_defaults_and_status_parsing() {
    let filter = ListOrdersQuery::default().into_filter().unwrap();
    assert_eq!(filter, OrderFilter::default());

    let filter = ListOrdersQuery {
      page: Some(3),
      limit: Some(25),
      status: Some("shipped".to_string()),
    }
    .into_filter()
    .unwrap();
    assert_eq!(filter.page, 3);
    assert_eq!(filter.status, Some(OrderStatus::Shipped));

    let blank = ListOrdersQuery {
      status: Some("  ".to_string()),
      ..Default::default()
    };
    assert_eq!(blank.into_filter().unwrap().status, None);
  }

  #[test]
  fn unknown_status_is_a_validation_error() {
    let err = parse_status("LOST").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(matches!(parse_status(""), Err(AppError::Validation(msg)) if msg == "Status is required"));
  }
}

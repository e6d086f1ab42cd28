// shopfront_app/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use shopfront::ShopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Auth(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error(transparent)]
  Shop(#[from] ShopError),
}

fn shop_status(err: &ShopError) -> StatusCode {
  match err {
    ShopError::Validation(_)
    | ShopError::OutOfStock { .. }
    | ShopError::CartEmpty
    | ShopError::ProductUnavailable(_)
    | ShopError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
    ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
    ShopError::NotFound(_) => StatusCode::NOT_FOUND,
    ShopError::Conflict(_) => StatusCode::CONFLICT,
    ShopError::Shipping { .. } | ShopError::Storage { .. } | ShopError::Pipeline(_) | ShopError::Internal(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Shop(err) => shop_status(err),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Migrate(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      // Details stay in the logs.
      tracing::error!(application_error = %self, "Responding with error");
      return HttpResponse::build(status).json(json!({"error": "An internal error occurred"}));
    }
    tracing::warn!(application_error = %self, status = status.as_u16(), "Request rejected");
    HttpResponse::build(status).json(json!({"error": self.to_string()}))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use shopfront::model::OrderStatus;
  use uuid::Uuid;

  #[test]
  fn business_rule_failures_are_bad_requests() {
    let out_of_stock = AppError::from(ShopError::OutOfStock {
      product_id: Uuid::new_v4(),
      name: "Lamp".to_string(),
    });
    assert_eq!(out_of_stock.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(out_of_stock.to_string(), "Lamp out of stock");

    let illegal = AppError::from(ShopError::InvalidTransition {
      from: OrderStatus::Delivered,
      to: OrderStatus::Cancelled,
      message: "Delivered orders cannot be cancelled".to_string(),
    });
    assert_eq!(illegal.status_code(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn access_and_concurrency_failures_map_to_their_codes() {
    assert_eq!(AppError::Auth("who?".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      AppError::from(ShopError::Forbidden("no".into())).status_code(),
      StatusCode::FORBIDDEN
    );
    assert_eq!(
      AppError::from(ShopError::NotFound("Order not found".into())).status_code(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      AppError::from(ShopError::Conflict("stale".into())).status_code(),
      StatusCode::CONFLICT
    );
  }

  #[test]
  fn storage_failures_hide_details() {
    let err = AppError::from(ShopError::storage(anyhow::anyhow!("connection reset by peer")));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let response = err.error_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let config = AppError::Config("SHIPPING_ORIGIN_POSTCODE is required".into());
    assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}

// shopfront/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::model::OrderStatus;

/// Framework-level failures raised by the step pipeline itself rather than by
/// a step handler.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },
}

#[derive(Debug, Error)]
pub enum ShopError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{name} out of stock")]
  OutOfStock { product_id: Uuid, name: String },

  #[error("Cart empty")]
  CartEmpty,

  #[error("{0}")]
  ProductUnavailable(String),

  #[error("{message}")]
  InvalidTransition {
    from: OrderStatus,
    to: OrderStatus,
    message: String,
  },

  #[error("{0}")]
  Conflict(String),

  #[error("Shipping provider error: {source}")]
  Shipping {
    #[source]
    source: AnyhowError,
  },

  #[error("Storage error: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },

  #[error("Pipeline error: {0}")]
  Pipeline(#[from] PipelineError),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl ShopError {
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    ShopError::Storage { source: err.into() }
  }

  pub fn shipping(err: impl Into<AnyhowError>) -> Self {
    ShopError::Shipping { source: err.into() }
  }

  /// True for failures the caller caused: bad input, business rules, missing
  /// or foreign resources. Such errors are never worth retrying.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      ShopError::Validation(_)
        | ShopError::NotFound(_)
        | ShopError::Forbidden(_)
        | ShopError::OutOfStock { .. }
        | ShopError::CartEmpty
        | ShopError::ProductUnavailable(_)
        | ShopError::InvalidTransition { .. }
        | ShopError::Conflict(_)
    )
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;

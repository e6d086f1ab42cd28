// shopfront_app/src/web/extractors.rs

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use shopfront::model::Actor;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Caller identity as forwarded by the gateway in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub is_admin: bool,
}

impl AuthenticatedUser {
  pub fn actor(&self) -> Actor {
    if self.is_admin {
      Actor::admin(self.user_id)
    } else {
      Actor::customer(self.user_id)
    }
  }
}

fn identify(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let user_id = req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| Uuid::parse_str(v.trim()).ok())
    .ok_or_else(|| {
      warn!("Missing or invalid {USER_ID_HEADER} header.");
      AppError::Auth("Authentication required".to_string())
    })?;

  let is_admin = req
    .headers()
    .get(USER_ROLE_HEADER)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

  Ok(AuthenticatedUser { user_id, is_admin })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(identify(req))
  }
}

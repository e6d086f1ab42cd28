// shopfront/src/model/address.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved delivery address. Orders keep a copy, never a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
  pub is_default: bool,
}

impl Address {
  /// The postal code, if it holds anything besides whitespace.
  pub fn deliverable_postal_code(&self) -> Option<&str> {
    let code = self.postal_code.trim();
    (!code.is_empty()).then_some(code)
  }
}

// shopfront/src/model/cart.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub color: Option<String>,
  pub size: Option<String>,
  pub quantity: i32,
  /// Price shown when the item was added. Pricing never reads it back.
  pub unit_price_cents: i64,
  pub added_at: DateTime<Utc>,
}

// shopfront/src/status.rs

//! The order status graph. Every status change goes through
//! [`apply_transition`]; nothing else writes `Order::status`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ShopError, ShopResult};
use crate::model::{Actor, Order, OrderStatus, PaymentStatus, StatusHistoryEntry};

impl OrderStatus {
  /// Targets reachable in one step from `self`.
  pub fn allowed_targets(self) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match self {
      Placed => &[Confirmed, Cancelled],
      Confirmed => &[Packed, Cancelled],
      Packed => &[Shipped, Cancelled],
      Shipped => &[Delivered, Cancelled],
      Delivered => &[Returned],
      Cancelled => &[],
      Returned => &[],
    }
  }

  pub fn can_transition_to(self, to: OrderStatus) -> bool {
    self == to || self.allowed_targets().contains(&to)
  }

  /// Reason recorded in the history when the caller gives none.
  pub fn default_reason(self) -> &'static str {
    match self {
      OrderStatus::Placed => "Order placed",
      OrderStatus::Confirmed => "Order confirmed",
      OrderStatus::Packed => "Order packed",
      OrderStatus::Shipped => "Order shipped",
      OrderStatus::Delivered => "Order delivered",
      OrderStatus::Cancelled => "Order cancelled",
      OrderStatus::Returned => "Order returned",
    }
  }
}

/// Specific explanation for a rejected `(from, to)` pair, if one is written down.
fn rejection_message(from: OrderStatus, to: OrderStatus) -> Option<&'static str> {
  use OrderStatus::*;
  let message = match (from, to) {
    (Placed, Packed) => "Order must be confirmed before it can be packed",
    (Placed | Confirmed, Shipped) => "Order must be packed before it can be shipped",
    (Placed | Confirmed | Packed, Delivered) => "Order must be shipped before it can be delivered",
    (Placed | Confirmed | Packed, Returned) => "Only delivered orders can be returned",
    (Shipped, Returned) => "Order must be delivered before it can be returned",
    (Confirmed, Placed) => "Confirmed orders cannot move back to placed",
    (Packed, Placed | Confirmed) => "Packed orders cannot move back to an earlier status",
    (Shipped, Placed | Confirmed | Packed) => "Shipped orders cannot move back to an earlier status",
    (Delivered, Cancelled) => "Delivered orders cannot be cancelled",
    (Delivered, Placed | Confirmed | Packed | Shipped) => "Delivered orders cannot move back to an earlier status",
    (Cancelled, _) => "Cancelled orders cannot be updated",
    (Returned, _) => "Returned orders cannot be updated",
    _ => return None,
  };
  Some(message)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionCheck {
  pub valid: bool,
  pub message: Option<String>,
}

/// Checks `from -> to` against the graph without touching any order.
pub fn validate(from: OrderStatus, to: OrderStatus) -> TransitionCheck {
  if from.can_transition_to(to) {
    return TransitionCheck {
      valid: true,
      message: None,
    };
  }

  let message = rejection_message(from, to)
    .map(str::to_string)
    .unwrap_or_else(|| format!("Cannot change order status from {from} to {to}"));
  TransitionCheck {
    valid: false,
    message: Some(message),
  }
}

/// What an applied transition did, so stores know which side effects to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
  /// `from == to`; the order is untouched.
  Unchanged,
  Applied { from: OrderStatus, to: OrderStatus },
}

/// Moves `order` to `to`, or returns `InvalidTransition` leaving it untouched.
///
/// On success a history entry is appended. DELIVERED stamps `delivered_at` and
/// settles cash-on-delivery payment; CANCELLED records the reason.
pub fn apply_transition(
  order: &mut Order,
  to: OrderStatus,
  actor: Actor,
  reason: Option<&str>,
  now: DateTime<Utc>,
) -> ShopResult<TransitionOutcome> {
  let from = order.status;
  let check = validate(from, to);
  if !check.valid {
    return Err(ShopError::InvalidTransition {
      from,
      to,
      message: check.message.unwrap_or_default(),
    });
  }
  if from == to {
    return Ok(TransitionOutcome::Unchanged);
  }

  let reason = reason
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .unwrap_or_else(|| to.default_reason())
    .to_string();

  match to {
    OrderStatus::Delivered => {
      order.delivered_at = Some(now);
      if order.payment_mode.is_cod() {
        order.payment_status = PaymentStatus::Paid;
      }
    }
    OrderStatus::Cancelled => {
      order.cancellation_reason = Some(reason.clone());
    }
    _ => {}
  }

  order.status_history.push(StatusHistoryEntry {
    from: Some(from),
    status: to,
    changed_at: now,
    actor,
    reason,
  });
  order.status = to;
  order.updated_at = now;

  tracing::info!(order_id = %order.id, %from, %to, actor = actor.role.as_str(), "Order status changed.");
  Ok(TransitionOutcome::Applied { from, to })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_status_is_always_valid() {
    for status in OrderStatus::ALL {
      assert_eq!(
        validate(status, status),
        TransitionCheck {
          valid: true,
          message: None
        }
      );
    }
  }

  #[test]
  fn every_listed_target_is_valid() {
    for from in OrderStatus::ALL {
      for &to in from.allowed_targets() {
        assert!(validate(from, to).valid, "{from} -> {to} should be allowed");
      }
    }
  }

  #[test]
  fn every_unlisted_pair_has_a_message() {
    for from in OrderStatus::ALL {
      for to in OrderStatus::ALL {
        if from == to || from.allowed_targets().contains(&to) {
          continue;
        }
        let check = validate(from, to);
        assert!(!check.valid);
        assert!(check.message.is_some_and(|m| !m.is_empty()), "{from} -> {to} needs a message");
      }
    }
  }

  #[test]
  fn delivered_to_cancelled_message() {
    let check = validate(OrderStatus::Delivered, OrderStatus::Cancelled);
    assert_eq!(check.message.as_deref(), Some("Delivered orders cannot be cancelled"));
  }

  #[test]
  fn terminal_states_have_no_targets() {
    assert!(OrderStatus::Cancelled.allowed_targets().is_empty());
    assert!(OrderStatus::Returned.allowed_targets().is_empty());
    assert!(OrderStatus::Cancelled.is_terminal());
    assert!(!OrderStatus::Delivered.is_terminal());
  }

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!(" shipped ".parse::<OrderStatus>().ok(), Some(OrderStatus::Shipped));
    assert_eq!("Returned".parse::<OrderStatus>().ok(), Some(OrderStatus::Returned));
    assert!("lost".parse::<OrderStatus>().is_err());
  }
}

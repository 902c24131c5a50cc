//! Represents a confirmed customer order.
//!
//! Orders are only created once every pipeline step has succeeded, and are never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Type-safe identifier for Orders, generated per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// `Confirmed` is the only state a stored order can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Currency amount, always positive with two decimals.
    pub amount: f64,
    pub status: OrderStatus,
}

impl Order {
    pub fn confirmed(id: OrderId, amount: f64) -> Self {
        Self {
            id,
            amount,
            status: OrderStatus::Confirmed,
        }
    }
}

/// Payload for creating a new order. Without an amount, one is drawn at random.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub amount: Option<f64>,
}

impl OrderRequest {
    pub fn with_amount(amount: f64) -> Self {
        Self {
            amount: Some(amount),
        }
    }
}

/// Rounds to cents; `None` unless the result is finite and positive.
pub fn normalize_amount(amount: f64) -> Option<f64> {
    let rounded = (amount * 100.0).round() / 100.0;
    (rounded.is_finite() && rounded > 0.0).then_some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_rounded_to_cents() {
        assert_eq!(normalize_amount(12.346), Some(12.35));
        assert_eq!(normalize_amount(0.004), None);
        assert_eq!(normalize_amount(-3.0), None);
        assert_eq!(normalize_amount(f64::NAN), None);
        assert_eq!(normalize_amount(f64::INFINITY), None);
    }

    #[test]
    fn order_serializes_with_lowercase_status() {
        let order = Order::confirmed(OrderId::new(), 10.5);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["id"], order.id.to_string());
    }

    #[test]
    fn order_ids_round_trip_through_strings() {
        let id = OrderId::new();
        assert_eq!(id.to_string().parse::<OrderId>().unwrap(), id);
        assert!("not-a-uuid".parse::<OrderId>().is_err());
    }
}

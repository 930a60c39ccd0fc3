//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order.
///
/// ```text
/// active ◄──► complete
/// ```
///
/// Both states are stable. Transitions are explicit writes and `complete`
/// can be reverted to `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Line items may be added and changed.
    #[default]
    Active,

    /// The line-item set is frozen.
    Complete,
}

impl OrderStatus {
    /// Returns true if line items can be added or changed in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Active)
    }

    /// Returns the wire/storage name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a legal order status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status '{0}' (expected 'active' or 'complete')")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OrderStatus::Active),
            "complete" => Ok(OrderStatus::Complete),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

//! Items and the orders placed against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stocked item. `quantity` has no floor: orders may drive it negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub id:       i64,
  pub name:     String,
  pub quantity: i64,
}

/// An order for `number` units of the item called `item_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub id:         i64,
  pub item_name:  String,
  pub number:     i64,
  pub ordered_at: DateTime<Utc>,
}

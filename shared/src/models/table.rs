//! Table Model
//!
//! 桌台实时状态。每张桌位持有待出餐购物车、已出餐明细和分账信息，
//! 是整个服务端的核心聚合。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::time::format_clock;
use crate::types::Timestamp;

/// Number of tables in the venue, numbered 1..=10.
pub const TABLE_COUNT: u8 = 10;

/// Fallback person label when no diner is assigned to an item.
pub const SHARED_PERSON: &str = "Todos";

/// Validated table number (1..=10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TableId(u8);

#[derive(Debug, thiserror::Error)]
#[error("invalid table number (1-{TABLE_COUNT}): {0}")]
pub struct InvalidTableId(pub i64);

impl TableId {
    pub fn new(n: u8) -> Result<Self, InvalidTableId> {
        if (1..=TABLE_COUNT).contains(&n) {
            Ok(Self(n))
        } else {
            Err(InvalidTableId(n as i64))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index for slot-per-table storage.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn all() -> impl Iterator<Item = TableId> {
        (1..=TABLE_COUNT).map(TableId)
    }
}

impl TryFrom<u8> for TableId {
    type Error = InvalidTableId;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl TryFrom<i64> for TableId {
    type Error = InvalidTableId;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        u8::try_from(n)
            .map_err(|_| InvalidTableId(n))
            .and_then(Self::new)
    }
}

impl From<TableId> for u8 {
    fn from(id: TableId) -> u8 {
        id.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Active,
    Ordering,
    Waiting,
    Paying,
    PaidButOccupied,
}

/// Cart item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Served,
}

/// A line in a table's cart, pending or already served (购物车条目)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub notes: String,
    pub person: String,
    pub added_at: Timestamp,
    pub added_at_formatted: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at_formatted: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Transition into the served list at `now`.
    pub fn into_served(mut self, now: Timestamp) -> Self {
        self.status = ItemStatus::Served;
        self.served_at = Some(now);
        self.served_at_formatted = Some(format_clock(now));
        self
    }
}

/// Timestamps of the last activity of each kind on a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTimestamps {
    pub last_order: Option<Timestamp>,
    pub last_call: Option<Timestamp>,
    pub last_bill_request: Option<Timestamp>,
    pub last_served: Option<Timestamp>,
}

/// Table aggregate (桌台)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub pending_cart: Vec<CartItem>,
    pub served_items: Vec<CartItem>,
    pub split: bool,
    pub people: Vec<String>,
    pub status: TableStatus,
    pub current_total: f64,
    pub last_activity: Timestamp,
    pub consumption_by_person: HashMap<String, f64>,
    pub timestamps: ActivityTimestamps,
}

impl Table {
    pub fn new(id: TableId, now: Timestamp) -> Self {
        Self {
            id,
            pending_cart: Vec::new(),
            served_items: Vec::new(),
            split: false,
            people: Vec::new(),
            status: TableStatus::Available,
            current_total: 0.0,
            last_activity: now,
            consumption_by_person: HashMap::new(),
            timestamps: ActivityTimestamps::default(),
        }
    }

    /// Full reset back to `Available` (free-table).
    pub fn reset(&mut self, now: Timestamp) {
        let id = self.id;
        *self = Table::new(id, now);
    }

    /// Clear consumption for a new seating but stay `Active`. Used when a
    /// customer joins a table whose previous party paid and left.
    pub fn soft_reset(&mut self, now: Timestamp) {
        self.reset(now);
        self.status = TableStatus::Active;
    }

    pub fn is_empty(&self) -> bool {
        self.pending_cart.is_empty() && self.served_items.is_empty()
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity = now;
    }

    /// Resolve the diner label for a new cart item.
    ///
    /// Only meaningful in split mode; out-of-range indices fall back to
    /// the shared label.
    pub fn resolve_person(&self, person_index: Option<usize>) -> String {
        if self.split
            && let Some(idx) = person_index
            && let Some(name) = self.people.get(idx)
        {
            return name.clone();
        }
        SHARED_PERSON.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_accepts_range() {
        assert!(TableId::new(1).is_ok());
        assert!(TableId::new(10).is_ok());
        assert!(TableId::new(0).is_err());
        assert!(TableId::new(11).is_err());
        assert!(TableId::try_from(-3i64).is_err());
    }

    #[test]
    fn table_id_deserializes_from_number() {
        let id: TableId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
        assert!(serde_json::from_str::<TableId>("42").is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TableStatus::PaidButOccupied).unwrap();
        assert_eq!(json, "\"paid_but_occupied\"");
    }

    #[test]
    fn resolve_person_honours_split_mode() {
        let mut table = Table::new(TableId::new(1).unwrap(), 0);
        assert_eq!(table.resolve_person(Some(0)), SHARED_PERSON);

        table.split = true;
        table.people = vec!["Ana".into(), "Luis".into()];
        assert_eq!(table.resolve_person(Some(1)), "Luis");
        assert_eq!(table.resolve_person(Some(5)), SHARED_PERSON);
        assert_eq!(table.resolve_person(None), SHARED_PERSON);
    }

    #[test]
    fn soft_reset_keeps_table_active() {
        let mut table = Table::new(TableId::new(2).unwrap(), 0);
        table.status = TableStatus::PaidButOccupied;
        table.current_total = 42.0;
        table.people = vec!["Ana".into()];
        table.soft_reset(1_000);
        assert_eq!(table.status, TableStatus::Active);
        assert_eq!(table.current_total, 0.0);
        assert!(table.people.is_empty());
        assert_eq!(table.last_activity, 1_000);
    }
}

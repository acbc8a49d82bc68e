//! Append-only service records
//!
//! 呼叫、订单、账单三类记录只追加不删除，状态字段标记生命周期。
//! `elapsed_time` 由服务端定时刷新，客户端直接展示。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::table::{CartItem, TableId};
use crate::time::{format_clock, format_elapsed};
use crate::types::Timestamp;
use crate::util::entity_id;

pub const CALL_REASON_DEFAULT: &str = "Atención requerida";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Waiting,
    Attended,
}

/// Waiter call record (呼叫服务员)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: i64,
    pub table_id: TableId,
    pub reason: String,
    pub time: Timestamp,
    pub time_formatted: String,
    pub elapsed_time: String,
    pub status: CallStatus,
    pub exact_timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at_formatted: Option<String>,
}

impl Call {
    pub fn new(table_id: TableId, now: Timestamp) -> Self {
        Self {
            id: entity_id(),
            table_id,
            reason: CALL_REASON_DEFAULT.to_string(),
            time: now,
            time_formatted: format_clock(now),
            elapsed_time: "0s".to_string(),
            status: CallStatus::Waiting,
            exact_timestamp: now,
            attended_at: None,
            attended_at_formatted: None,
        }
    }

    pub fn attend(&mut self, now: Timestamp) {
        self.status = CallStatus::Attended;
        self.attended_at = Some(now);
        self.attended_at_formatted = Some(format_clock(now));
    }

    pub fn refresh_elapsed(&mut self, now: Timestamp) {
        if self.status == CallStatus::Waiting {
            self.elapsed_time = format_elapsed(self.time, now);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Served,
}

/// A line captured from the cart at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub person: String,
    pub notes: String,
    pub added_at_formatted: String,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
            person: item.person.clone(),
            notes: item.notes.clone(),
            added_at_formatted: item.added_at_formatted.clone(),
        }
    }
}

/// Kitchen/bar order record (订单)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub table_id: TableId,
    pub items: Vec<OrderLine>,
    pub total: f64,
    pub split: bool,
    pub people: Vec<String>,
    pub created_at: Timestamp,
    pub created_at_formatted: String,
    pub elapsed_time: String,
    pub status: OrderStatus,
    pub exact_timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at_formatted: Option<String>,
}

impl Order {
    pub fn mark_served(&mut self, now: Timestamp) {
        self.status = OrderStatus::Served;
        self.served_at = Some(now);
        self.served_at_formatted = Some(format_clock(now));
    }

    pub fn refresh_elapsed(&mut self, now: Timestamp) {
        if self.status == OrderStatus::Pending {
            self.elapsed_time = format_elapsed(self.created_at, now);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Paid,
}

/// A merged line on a bill, served or still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLine {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub person: String,
    pub status: super::table::ItemStatus,
    pub subtotal: f64,
    pub time_added: String,
}

impl From<&CartItem> for BillLine {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
            person: item.person.clone(),
            status: item.status,
            subtotal: item.price * item.quantity as f64,
            time_added: item.added_at_formatted.clone(),
        }
    }
}

/// Bill record (账单)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: i64,
    pub table_id: TableId,
    pub items: Vec<BillLine>,
    pub total: f64,
    pub split: bool,
    pub people: Vec<String>,
    pub current_total: f64,
    pub consumption_by_person: HashMap<String, f64>,
    pub requested_at: Timestamp,
    pub requested_at_formatted: String,
    pub elapsed_time: String,
    pub status: BillStatus,
    pub exact_timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_person: Option<HashMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at_formatted: Option<String>,
}

impl Bill {
    pub fn mark_paid(&mut self, now: Timestamp) {
        self.status = BillStatus::Paid;
        self.paid_at = Some(now);
        self.paid_at_formatted = Some(format_clock(now));
    }

    pub fn refresh_elapsed(&mut self, now: Timestamp) {
        if self.status == BillStatus::Pending {
            self.elapsed_time = format_elapsed(self.requested_at, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table::ItemStatus;
    use crate::util::now_millis;

    fn table_id(n: u8) -> TableId {
        TableId::new(n).unwrap()
    }

    #[test]
    fn new_call_starts_waiting() {
        let now = now_millis();
        let call = Call::new(table_id(3), now);
        assert_eq!(call.status, CallStatus::Waiting);
        assert_eq!(call.elapsed_time, "0s");
        assert_eq!(call.reason, CALL_REASON_DEFAULT);
        assert!(call.attended_at.is_none());
    }

    #[test]
    fn attended_call_keeps_elapsed_frozen() {
        let mut call = Call::new(table_id(1), 0);
        call.refresh_elapsed(30_000);
        assert_eq!(call.elapsed_time, "30s");
        call.attend(45_000);
        call.refresh_elapsed(90_000);
        assert_eq!(call.elapsed_time, "30s");
    }

    #[test]
    fn bill_line_subtotal() {
        let item = CartItem {
            id: 1,
            product_id: 1,
            name: "Guinness".into(),
            price: 8.5,
            quantity: 2,
            notes: String::new(),
            person: "Todos".into(),
            added_at: 0,
            added_at_formatted: "00:00:00".into(),
            status: ItemStatus::Pending,
            served_at: None,
            served_at_formatted: None,
        };
        let line = BillLine::from(&item);
        assert_eq!(line.subtotal, 17.0);
        assert_eq!(line.status, ItemStatus::Pending);
    }

    #[test]
    fn optional_fields_skipped_when_unset() {
        let call = Call::new(table_id(2), 0);
        let json = serde_json::to_value(&call).unwrap();
        assert!(json.get("attendedAt").is_none());
        assert!(json.get("tableId").is_some());
    }
}

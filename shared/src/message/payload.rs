//! 业务消息载荷定义
//!
//! 客户端请求与服务端事件各自是一个封闭的枚举，线上格式为
//! `{"event": "<kebab-case>", "data": {...}}`。新增事件必须在这里
//! 登记，服务端 dispatch 是穷尽匹配。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::records::{Bill, Call, Order};
use crate::models::table::{CartItem, Table, TableId, TableStatus};
use crate::types::Timestamp;

/// Everything a customer or staff client may ask of the server.
///
/// `table_id` fields stay raw so that out-of-range numbers reach the
/// handler and come back as a typed `error` event instead of a parse
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    JoinTable {
        table_id: i64,
    },
    SetBillType {
        split: bool,
        #[serde(default)]
        people: Option<Vec<String>>,
    },
    AddToCart {
        product_id: i64,
        #[serde(default)]
        quantity: Option<u32>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        person_index: Option<usize>,
    },
    RemoveFromCart {
        item_id: i64,
    },
    CallWaiter,
    PlaceOrder,
    RequestBill,
    JoinAsAdmin {
        password: String,
    },
    AttendCall {
        call_id: i64,
    },
    MarkOrderServed {
        order_id: i64,
    },
    MarkBillPaid {
        bill_id: i64,
    },
    FreeTable {
        table_id: i64,
    },
    Ping,
}

/// Snapshot of a table as seen by its own customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub pending_cart: Vec<CartItem>,
    pub served_items: Vec<CartItem>,
    pub split: bool,
    pub people: Vec<String>,
    pub current_total: f64,
    pub consumption_by_person: HashMap<String, f64>,
    pub status: TableStatus,
}

impl From<&Table> for TableState {
    fn from(table: &Table) -> Self {
        Self {
            pending_cart: table.pending_cart.clone(),
            served_items: table.served_items.clone(),
            split: table.split,
            people: table.people.clone(),
            current_total: table.current_total,
            consumption_by_person: table.consumption_by_person.clone(),
            status: table.status,
        }
    }
}

/// Live records plus all tables, as handed to a staff panel on join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSnapshot {
    pub calls: Vec<Call>,
    pub orders: Vec<Order>,
    pub bills: Vec<Bill>,
    pub tables: Vec<Table>,
}

/// Everything the server may push to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    // ---- customer-facing ----
    TableConnected {
        table_id: TableId,
        table_state: TableState,
    },
    BillTypeSet {
        split: bool,
        people: Vec<String>,
        consumption_by_person: HashMap<String, f64>,
    },
    CartUpdated(TableState),
    WaiterCalled {
        message: String,
        call_id: i64,
        time: String,
    },
    OrderConfirmed {
        order_id: i64,
        message: String,
        time: String,
    },
    BillPrepared {
        #[serde(flatten)]
        bill: Bill,
        message: String,
    },
    ItemsServed {
        items: Vec<CartItem>,
        current_total: f64,
        consumption_by_person: HashMap<String, f64>,
        serve_time: String,
    },
    WaiterArriving,
    BillPaid {
        message: String,
        final_total: f64,
        paid_time: String,
    },
    TableFreed {
        message: String,
    },
    ResetToBillSelection,
    Pong {
        time: Timestamp,
    },
    Error {
        message: String,
    },

    // ---- staff-facing ----
    AdminConnected(AdminSnapshot),
    NewCall(Call),
    NewOrder(Order),
    BillRequested(Bill),
    CallAttended {
        call_id: i64,
    },
    OrderServed {
        order_id: i64,
        table_id: TableId,
        served_items: Vec<CartItem>,
        serve_time: String,
    },
    TableUpdated(Table),
    TimesUpdated {
        calls: Vec<Call>,
        orders: Vec<Order>,
        bills: Vec<Bill>,
    },
}

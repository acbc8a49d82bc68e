//! 店面状态路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/state | GET | 桌台 + 进行中的呼叫/订单/账单 |
//!
//! 员工面板轮询或调试用的只读视图，字段命名与实时事件一致。

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use shared::models::records::{Bill, Call, Order};
use shared::models::table::Table;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/state", get(public_state))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStateResponse {
    pub tables: Vec<Table>,
    pub active_calls: Vec<Call>,
    pub active_orders: Vec<Order>,
    pub active_bills: Vec<Bill>,
}

pub async fn public_state(State(state): State<ServerState>) -> Json<PublicStateResponse> {
    let snapshot = state.venue.admin_snapshot();
    Json(PublicStateResponse {
        tables: snapshot.tables,
        active_calls: snapshot.calls,
        active_orders: snapshot.orders,
        active_bills: snapshot.bills,
    })
}

//! 业务入口: 单写者持锁分发请求
//!
//! 所有可变状态收在一把 [`parking_lot::Mutex`] 后面。`handle` 在锁内
//! 完成纯状态转移，拿到 [`Outbound`] 列表后释放锁，网络层再做投递,
//! 锁从不跨越任何 await 点。

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use shared::message::payload::{AdminSnapshot, ClientRequest, ServerEvent};
use shared::models::menu::MenuCatalog;
use shared::types::Timestamp;
use shared::util::now_millis;

use super::state::VenueState;
use super::{Outbound, Session};

pub struct VenueService {
    catalog: Arc<MenuCatalog>,
    admin_password: String,
    state: Mutex<VenueState>,
    /// 每次有效变更后唤醒快照 worker
    dirty: Notify,
}

impl VenueService {
    pub fn new(catalog: Arc<MenuCatalog>, admin_password: String) -> Self {
        Self {
            catalog,
            admin_password,
            state: Mutex::new(VenueState::new(now_millis())),
            dirty: Notify::new(),
        }
    }

    /// 分发一条已校验的客户端请求
    pub fn handle(&self, request: ClientRequest, session: &mut Session) -> Vec<Outbound> {
        let now = now_millis();
        self.handle_at(request, session, now)
    }

    /// 与 [`Self::handle`] 相同，但由调用方注入时间
    pub fn handle_at(
        &self,
        request: ClientRequest,
        session: &mut Session,
        now: Timestamp,
    ) -> Vec<Outbound> {
        // Ping 不碰状态，也不触发快照
        if matches!(request, ClientRequest::Ping) {
            return vec![Outbound::caller(ServerEvent::Pong { time: now })];
        }

        let out = {
            let mut state = self.state.lock();
            match request {
                ClientRequest::JoinTable { table_id } => {
                    state.join_table(session, table_id, now)
                }
                ClientRequest::SetBillType { split, people } => {
                    state.set_bill_type(session, split, people)
                }
                ClientRequest::AddToCart {
                    product_id,
                    quantity,
                    notes,
                    person_index,
                } => state.add_to_cart(
                    session,
                    &self.catalog,
                    product_id,
                    quantity,
                    notes,
                    person_index,
                    now,
                ),
                ClientRequest::RemoveFromCart { item_id } => {
                    state.remove_from_cart(session, item_id)
                }
                ClientRequest::CallWaiter => state.call_waiter(session, now),
                ClientRequest::PlaceOrder => state.place_order(session, now),
                ClientRequest::RequestBill => state.request_bill(session, now),
                ClientRequest::JoinAsAdmin { password } => {
                    if password != self.admin_password {
                        // 密码错误静默忽略，不给探测者任何反馈
                        tracing::warn!(conn_id = %session.conn_id, "Rejected admin join");
                        Vec::new()
                    } else {
                        state.admin_join(session, now)
                    }
                }
                ClientRequest::AttendCall { call_id } => state.attend_call(call_id, now),
                ClientRequest::MarkOrderServed { order_id } => {
                    state.mark_order_served(order_id, now)
                }
                ClientRequest::MarkBillPaid { bill_id } => state.mark_bill_paid(bill_id, now),
                ClientRequest::FreeTable { table_id } => state.free_table(table_id, now),
                ClientRequest::Ping => unreachable!("handled above"),
            }
        };

        if !out.is_empty() {
            self.dirty.notify_one();
        }
        out
    }

    /// 周期计时刷新 (员工面板倒计时)
    pub fn refresh_elapsed(&self) -> Outbound {
        self.state.lock().refresh_elapsed(now_millis())
    }

    /// 员工面板 HTTP 视图
    pub fn admin_snapshot(&self) -> AdminSnapshot {
        self.state.lock().admin_snapshot()
    }

    /// 在持锁回调里读状态 (快照导出用)
    pub fn with_state<T>(&self, f: impl FnOnce(&VenueState) -> T) -> T {
        f(&self.state.lock())
    }

    /// 在持锁回调里改状态 (快照恢复用)
    pub fn with_state_mut<T>(&self, f: impl FnOnce(&mut VenueState) -> T) -> T {
        f(&mut self.state.lock())
    }

    /// 等待下一次有效变更
    pub async fn wait_dirty(&self) {
        self.dirty.notified().await;
    }
}

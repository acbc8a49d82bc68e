//! 桌台状态机 - 纯状态转移
//!
//! 每个 handler 是 `(&mut self, ..., now) -> Vec<Outbound>`：
//! 修改内存状态并返回待投递事件，绝不做 I/O。时间一律由调用方
//! 注入，便于测试。

use shared::message::payload::{AdminSnapshot, ServerEvent, TableState};
use shared::models::records::{
    Bill, BillLine, BillStatus, Call, CallStatus, Order, OrderLine, OrderStatus,
};
use shared::models::table::{CartItem, ItemStatus, Table, TableId, TableStatus};
use shared::time::format_clock;
use shared::types::Timestamp;
use shared::util::entity_id;

use super::ledger;
use super::{Outbound, Session};

/// 全店内存状态: 10 张桌台 + 三类只追加记录
#[derive(Debug)]
pub struct VenueState {
    pub tables: Vec<Table>,
    pub calls: Vec<Call>,
    pub orders: Vec<Order>,
    pub bills: Vec<Bill>,
}

impl VenueState {
    pub fn new(now: Timestamp) -> Self {
        Self {
            tables: TableId::all().map(|id| Table::new(id, now)).collect(),
            calls: Vec::new(),
            orders: Vec::new(),
            bills: Vec::new(),
        }
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.index()]
    }

    fn no_table_error() -> Vec<Outbound> {
        vec![Outbound::caller(ServerEvent::Error {
            message: "No table joined".into(),
        })]
    }

    // ---- customer handlers ----

    /// 绑定连接到桌台，必要时清理上一拨客人留下的状态
    pub fn join_table(
        &mut self,
        session: &mut Session,
        raw_id: i64,
        now: Timestamp,
    ) -> Vec<Outbound> {
        let Ok(id) = TableId::try_from(raw_id) else {
            return vec![Outbound::caller(ServerEvent::Error {
                message: "Invalid table (1-10)".into(),
            })];
        };

        session.table = Some(id);

        let table = self.table_mut(id);
        match table.status {
            // 上一拨客人已付款离开，为新客清空
            TableStatus::PaidButOccupied => table.soft_reset(now),
            TableStatus::Available => table.status = TableStatus::Active,
            _ => {}
        }
        table.touch(now);

        let table = self.table(id);
        vec![
            Outbound::caller(ServerEvent::TableConnected {
                table_id: id,
                table_state: TableState::from(table),
            }),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 整桌/分账切换，全量重算人头账本
    pub fn set_bill_type(
        &mut self,
        session: &Session,
        split: bool,
        people: Option<Vec<String>>,
    ) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };

        let table = self.table_mut(id);
        table.split = split;
        table.people = people.unwrap_or_default();
        table.consumption_by_person = ledger::consumption_by_person(table);

        let table = self.table(id);
        vec![
            Outbound::caller(ServerEvent::BillTypeSet {
                split: table.split,
                people: table.people.clone(),
                consumption_by_person: table.consumption_by_person.clone(),
            }),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 加入购物车。未知商品是定义好的静默 no-op。
    #[allow(clippy::too_many_arguments)]
    pub fn add_to_cart(
        &mut self,
        session: &Session,
        catalog: &shared::models::menu::MenuCatalog,
        product_id: i64,
        quantity: Option<u32>,
        notes: Option<String>,
        person_index: Option<usize>,
        now: Timestamp,
    ) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };
        let Some(product) = catalog.get(product_id) else {
            tracing::debug!(product_id, "Ignoring add-to-cart for unknown product");
            return Vec::new();
        };

        let quantity = quantity.unwrap_or(1).max(1);
        let price = product.price;
        let name = product.name.clone();

        let table = self.table_mut(id);
        let person = table.resolve_person(person_index);

        let item = CartItem {
            id: entity_id(),
            product_id,
            name,
            price,
            quantity,
            notes: notes.unwrap_or_default(),
            person: person.clone(),
            added_at: now,
            added_at_formatted: format_clock(now),
            status: ItemStatus::Pending,
            served_at: None,
            served_at_formatted: None,
        };

        // 分账模式下增量维护账本；整桌模式只看 current_total
        if table.split {
            ledger::accumulate(
                &mut table.consumption_by_person,
                &person,
                ledger::line_total(&item),
            );
        }

        table.pending_cart.push(item);
        table.status = TableStatus::Ordering;
        table.touch(now);

        let table = self.table(id);
        vec![
            Outbound::caller(ServerEvent::CartUpdated(TableState::from(table))),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 从待出餐购物车删除一条。找不到时仍回发当前视图。
    pub fn remove_from_cart(
        &mut self,
        session: &Session,
        item_id: i64,
    ) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };

        let table = self.table_mut(id);
        if let Some(pos) = table.pending_cart.iter().position(|i| i.id == item_id) {
            let removed = table.pending_cart.remove(pos);
            if table.split {
                ledger::deduct(
                    &mut table.consumption_by_person,
                    &removed.person,
                    ledger::line_total(&removed),
                );
            }
        }
        if table.is_empty() {
            table.status = TableStatus::Active;
        }

        let table = self.table(id);
        vec![
            Outbound::caller(ServerEvent::CartUpdated(TableState::from(table))),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 呼叫服务员
    pub fn call_waiter(&mut self, session: &Session, now: Timestamp) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };

        let call = Call::new(id, now);
        let table = self.table_mut(id);
        table.timestamps.last_call = Some(now);
        table.touch(now);

        let call_id = call.id;
        self.calls.push(call.clone());

        tracing::info!(table = %id, call_id, "Waiter called");
        vec![
            Outbound::admins(ServerEvent::NewCall(call)),
            Outbound::caller(ServerEvent::WaiterCalled {
                message: "✅ Mozo notificado".into(),
                call_id,
                time: format_clock(now),
            }),
        ]
    }

    /// 下单: 快照整个购物车，购物车本身保留到出餐才移动
    pub fn place_order(&mut self, session: &Session, now: Timestamp) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };

        let table = self.table_mut(id);
        if table.pending_cart.is_empty() {
            return vec![Outbound::caller(ServerEvent::Error {
                message: "No hay productos para pedir".into(),
            })];
        }

        let order = Order {
            id: entity_id(),
            table_id: id,
            items: table.pending_cart.iter().map(OrderLine::from).collect(),
            total: ledger::calculate_total(&table.pending_cart),
            split: table.split,
            people: table.people.clone(),
            created_at: now,
            created_at_formatted: format_clock(now),
            elapsed_time: "0s".into(),
            status: OrderStatus::Pending,
            exact_timestamp: now,
            served_at: None,
            served_at_formatted: None,
        };

        table.timestamps.last_order = Some(now);
        table.status = TableStatus::Waiting;
        table.touch(now);

        let order_id = order.id;
        self.orders.push(order.clone());

        tracing::info!(table = %id, order_id, total = order.total, "Order placed");
        let table = self.table(id);
        vec![
            Outbound::admins(ServerEvent::NewOrder(order)),
            Outbound::caller(ServerEvent::OrderConfirmed {
                order_id,
                message: "Pedido enviado a la barra".into(),
                time: format_clock(now),
            }),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 请求结账: 合并已出餐 + 待出餐生成账单
    pub fn request_bill(&mut self, session: &Session, now: Timestamp) -> Vec<Outbound> {
        let Some(id) = session.table else {
            return Self::no_table_error();
        };

        let table = self.table_mut(id);
        let all_items: Vec<CartItem> = table
            .served_items
            .iter()
            .chain(table.pending_cart.iter())
            .cloned()
            .collect();

        let total = ledger::calculate_total(&all_items);

        let per_person = if table.split && !table.people.is_empty() && !all_items.is_empty() {
            Some(
                table
                    .people
                    .iter()
                    .map(|person| {
                        let person_items: Vec<CartItem> = all_items
                            .iter()
                            .filter(|i| &i.person == person)
                            .cloned()
                            .collect();
                        (person.clone(), ledger::calculate_total(&person_items))
                    })
                    .collect(),
            )
        } else {
            None
        };

        let bill = Bill {
            id: entity_id(),
            table_id: id,
            items: all_items.iter().map(BillLine::from).collect(),
            total,
            split: table.split,
            people: table.people.clone(),
            current_total: table.current_total,
            consumption_by_person: table.consumption_by_person.clone(),
            requested_at: now,
            requested_at_formatted: format_clock(now),
            elapsed_time: "0s".into(),
            status: BillStatus::Pending,
            exact_timestamp: now,
            per_person,
            paid_at: None,
            paid_at_formatted: None,
        };

        table.timestamps.last_bill_request = Some(now);
        table.status = TableStatus::Paying;
        table.touch(now);

        self.bills.push(bill.clone());

        tracing::info!(table = %id, bill_id = bill.id, total, "Bill requested");
        let message = format!("✅ Cuenta solicitada: ${:.2}", total);
        let table = self.table(id);
        vec![
            Outbound::admins(ServerEvent::BillRequested(bill.clone())),
            Outbound::caller(ServerEvent::BillPrepared { bill, message }),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    // ---- staff handlers ----

    /// 员工加入: 先刷新计时再推送全量快照
    pub fn admin_join(&mut self, session: &mut Session, now: Timestamp) -> Vec<Outbound> {
        session.is_admin = true;
        let times = self.refresh_elapsed(now);
        vec![
            times,
            Outbound::caller(ServerEvent::AdminConnected(self.admin_snapshot())),
        ]
    }

    /// 响应呼叫。已处理或不存在的呼叫是幂等 no-op。
    pub fn attend_call(&mut self, call_id: i64, now: Timestamp) -> Vec<Outbound> {
        let Some(call) = self
            .calls
            .iter_mut()
            .find(|c| c.id == call_id && c.status == CallStatus::Waiting)
        else {
            return Vec::new();
        };

        call.attend(now);
        let table_id = call.table_id;
        self.table_mut(table_id).touch(now);

        tracing::info!(table = %table_id, call_id, "Call attended");
        vec![
            Outbound::admins(ServerEvent::CallAttended { call_id }),
            Outbound::table(table_id, ServerEvent::WaiterArriving),
        ]
    }

    /// 出餐: 订单快照里的条目从待出餐移入已出餐。
    ///
    /// 已经不在购物车里的条目 (例如被客人删掉) 静默跳过。
    pub fn mark_order_served(&mut self, order_id: i64, now: Timestamp) -> Vec<Outbound> {
        let Some(order) = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::Pending)
        else {
            return Vec::new();
        };

        order.mark_served(now);
        let table_id = order.table_id;
        let line_ids: Vec<i64> = order.items.iter().map(|line| line.id).collect();

        let table = &mut self.tables[table_id.index()];
        let mut served = Vec::new();
        let mut served_value = ledger::to_decimal(table.current_total);

        for line_id in line_ids {
            if let Some(pos) = table.pending_cart.iter().position(|i| i.id == line_id) {
                let item = table.pending_cart.remove(pos).into_served(now);
                served_value += ledger::line_total(&item);
                table.served_items.push(item.clone());
                served.push(item);
            }
        }

        table.current_total = ledger::to_f64(served_value);
        table.timestamps.last_served = Some(now);
        if table.pending_cart.is_empty() {
            table.status = TableStatus::Active;
        }
        table.consumption_by_person = ledger::consumption_by_person(table);
        table.touch(now);

        let serve_time = format_clock(now);
        let table = self.table(table_id);

        tracing::info!(table = %table_id, order_id, items = served.len(), "Order served");
        vec![
            Outbound::table(
                table_id,
                ServerEvent::ItemsServed {
                    items: served.clone(),
                    current_total: table.current_total,
                    consumption_by_person: table.consumption_by_person.clone(),
                    serve_time: serve_time.clone(),
                },
            ),
            Outbound::table(
                table_id,
                ServerEvent::CartUpdated(TableState::from(table)),
            ),
            Outbound::admins(ServerEvent::OrderServed {
                order_id,
                table_id,
                served_items: served,
                serve_time,
            }),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 账单结清，桌台进入"已付款仍占用"
    pub fn mark_bill_paid(&mut self, bill_id: i64, now: Timestamp) -> Vec<Outbound> {
        let Some(bill) = self
            .bills
            .iter_mut()
            .find(|b| b.id == bill_id && b.status == BillStatus::Pending)
        else {
            return Vec::new();
        };

        bill.mark_paid(now);
        let table_id = bill.table_id;
        let final_total = bill.total;

        let table = &mut self.tables[table_id.index()];
        table.status = TableStatus::PaidButOccupied;
        table.touch(now);

        let table = self.table(table_id);
        tracing::info!(table = %table_id, bill_id, total = final_total, "Bill paid");
        vec![
            Outbound::table(
                table_id,
                ServerEvent::BillPaid {
                    message: "✅ Pago confirmado - ¡Gracias!".into(),
                    final_total,
                    paid_time: format_clock(now),
                },
            ),
            Outbound::table(
                table_id,
                ServerEvent::CartUpdated(TableState::from(table)),
            ),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    /// 释放桌台: 无条件完全复位
    pub fn free_table(&mut self, raw_id: i64, now: Timestamp) -> Vec<Outbound> {
        let Ok(id) = TableId::try_from(raw_id) else {
            return Vec::new();
        };

        let table = self.table_mut(id);
        table.reset(now);

        let table = self.table(id);
        tracing::info!(table = %id, "Table freed");
        vec![
            Outbound::table(
                id,
                ServerEvent::TableFreed {
                    message: "Mesa liberada - ¡Hasta la próxima!".into(),
                },
            ),
            Outbound::table(id, ServerEvent::CartUpdated(TableState::from(table))),
            Outbound::table(id, ServerEvent::ResetToBillSelection),
            Outbound::admins(ServerEvent::TableUpdated(table.clone())),
        ]
    }

    // ---- ticker & views ----

    /// 刷新所有等待中记录的已等待时长，并广播给员工面板
    pub fn refresh_elapsed(&mut self, now: Timestamp) -> Outbound {
        for call in &mut self.calls {
            call.refresh_elapsed(now);
        }
        for order in &mut self.orders {
            order.refresh_elapsed(now);
        }
        for bill in &mut self.bills {
            bill.refresh_elapsed(now);
        }

        Outbound::admins(ServerEvent::TimesUpdated {
            calls: self.waiting_calls(),
            orders: self.pending_orders(),
            bills: self.pending_bills(),
        })
    }

    pub fn waiting_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|c| c.status == CallStatus::Waiting)
            .cloned()
            .collect()
    }

    pub fn pending_orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn pending_bills(&self) -> Vec<Bill> {
        self.bills
            .iter()
            .filter(|b| b.status == BillStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn admin_snapshot(&self) -> AdminSnapshot {
        AdminSnapshot {
            calls: self.waiting_calls(),
            orders: self.pending_orders(),
            bills: self.pending_bills(),
            tables: self.tables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::menu::MenuCatalog;
    use uuid::Uuid;

    const NOW: Timestamp = 1_704_067_200_000;

    fn setup() -> (VenueState, MenuCatalog, Session) {
        let state = VenueState::new(NOW);
        let catalog = MenuCatalog::embedded();
        let session = Session::new(Uuid::new_v4());
        (state, catalog, session)
    }

    fn join(state: &mut VenueState, session: &mut Session, table: i64) {
        state.join_table(session, table, NOW);
    }

    fn add(
        state: &mut VenueState,
        catalog: &MenuCatalog,
        session: &Session,
        product_id: i64,
        quantity: u32,
        person_index: Option<usize>,
    ) {
        state.add_to_cart(
            session,
            catalog,
            product_id,
            Some(quantity),
            None,
            person_index,
            NOW,
        );
    }

    fn has_caller_error(out: &[Outbound]) -> bool {
        out.iter().any(|o| {
            o.dest == super::super::Dest::Caller
                && matches!(o.event, ServerEvent::Error { .. })
        })
    }

    #[test]
    fn join_activates_available_table() {
        let (mut state, _, mut session) = setup();
        let out = state.join_table(&mut session, 3, NOW);

        assert_eq!(session.table, Some(TableId::new(3).unwrap()));
        assert_eq!(state.table(TableId::new(3).unwrap()).status, TableStatus::Active);
        assert!(matches!(
            out[0].event,
            ServerEvent::TableConnected { table_id, .. } if table_id.get() == 3
        ));
    }

    #[test]
    fn join_invalid_table_errors_and_leaves_state_untouched() {
        let (mut state, _, mut session) = setup();
        let out = state.join_table(&mut session, 42, NOW);

        assert!(has_caller_error(&out));
        assert!(session.table.is_none());
        assert!(state.tables.iter().all(|t| t.status == TableStatus::Available));
    }

    #[test]
    fn rejoin_after_payment_soft_resets() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 2);
        add(&mut state, &catalog, &session, 1, 2, None);
        state.place_order(&session, NOW);
        state.request_bill(&session, NOW);
        let bill_id = state.bills[0].id;
        state.mark_bill_paid(bill_id, NOW);

        let id = TableId::new(2).unwrap();
        assert_eq!(state.table(id).status, TableStatus::PaidButOccupied);

        let mut next_party = Session::new(Uuid::new_v4());
        state.join_table(&mut next_party, 2, NOW + 1_000);

        let table = state.table(id);
        assert_eq!(table.status, TableStatus::Active);
        assert!(table.is_empty());
        assert_eq!(table.current_total, 0.0);
        assert!(table.consumption_by_person.is_empty());
    }

    #[test]
    fn table_scoped_request_without_join_errors() {
        let (mut state, catalog, session) = setup();
        assert!(has_caller_error(&state.place_order(&session, NOW)));
        assert!(has_caller_error(&state.call_waiter(&session, NOW)));
        assert!(has_caller_error(&state.add_to_cart(
            &session, &catalog, 1, None, None, None, NOW
        )));
    }

    #[test]
    fn add_unknown_product_is_silent_noop() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);

        let out = state.add_to_cart(&session, &catalog, 999, None, None, None, NOW);
        assert!(out.is_empty());
        assert!(state.table(TableId::new(1).unwrap()).pending_cart.is_empty());
    }

    #[test]
    fn add_to_cart_defaults_and_clamps_quantity() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);

        state.add_to_cart(&session, &catalog, 1, None, None, None, NOW);
        state.add_to_cart(&session, &catalog, 1, Some(0), None, None, NOW);

        let table = state.table(TableId::new(1).unwrap());
        assert_eq!(table.pending_cart.len(), 2);
        assert!(table.pending_cart.iter().all(|i| i.quantity == 1));
        assert_eq!(table.status, TableStatus::Ordering);
    }

    #[test]
    fn incremental_ledger_matches_full_recompute() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 4);
        state.set_bill_type(&session, true, Some(vec!["Ana".into(), "Bea".into()]));

        add(&mut state, &catalog, &session, 1, 2, Some(0)); // Guinness x2 → Ana
        add(&mut state, &catalog, &session, 3, 1, Some(1)); // Coca Cola → Bea
        add(&mut state, &catalog, &session, 12, 1, None); // Pizza → Todos
        let item_id = state.table(TableId::new(4).unwrap()).pending_cart[1].id;
        state.remove_from_cart(&session, item_id);

        let table = state.table(TableId::new(4).unwrap());
        let full = ledger::consumption_by_person(table);
        for (person, amount) in &table.consumption_by_person {
            let expected = full.get(person).copied().unwrap_or(0.0);
            assert!(
                (amount - expected).abs() < 0.005,
                "ledger diverged for {person}: incremental {amount}, full {expected}"
            );
        }
    }

    #[test]
    fn removed_split_item_leaves_zeroed_entry() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 5);
        state.set_bill_type(&session, true, Some(vec!["Ana".into(), "Bea".into()]));

        add(&mut state, &catalog, &session, 15, 1, Some(0)); // 12.50 → Ana
        let id = TableId::new(5).unwrap();
        assert_eq!(state.table(id).consumption_by_person["Ana"], 12.5);

        let item_id = state.table(id).pending_cart[0].id;
        state.remove_from_cart(&session, item_id);
        assert_eq!(state.table(id).consumption_by_person["Ana"], 0.0);
        assert_eq!(state.table(id).status, TableStatus::Active);
    }

    #[test]
    fn place_order_on_empty_cart_errors_without_order() {
        let (mut state, _, mut session) = setup();
        join(&mut state, &mut session, 1);

        let out = state.place_order(&session, NOW);
        assert!(has_caller_error(&out));
        assert!(state.orders.is_empty());
    }

    #[test]
    fn place_order_snapshots_cart_without_clearing_it() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);
        add(&mut state, &catalog, &session, 1, 2, None);

        state.place_order(&session, NOW);

        let id = TableId::new(1).unwrap();
        assert_eq!(state.orders.len(), 1);
        let order = &state.orders[0];
        assert_eq!(order.total, 17.0);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.status, OrderStatus::Pending);
        // 购物车保留，出餐时才移动
        assert_eq!(state.table(id).pending_cart.len(), 1);
        assert_eq!(state.table(id).status, TableStatus::Waiting);
    }

    #[test]
    fn serve_moves_only_items_still_pending() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);
        add(&mut state, &catalog, &session, 1, 1, None);
        add(&mut state, &catalog, &session, 3, 1, None);
        state.place_order(&session, NOW);
        let order_id = state.orders[0].id;

        // 下单后客人删掉了其中一条
        let removed_id = state.table(TableId::new(1).unwrap()).pending_cart[1].id;
        state.remove_from_cart(&session, removed_id);

        state.mark_order_served(order_id, NOW + 5_000);

        let table = state.table(TableId::new(1).unwrap());
        assert_eq!(table.served_items.len(), 1);
        assert!(table.pending_cart.is_empty());
        assert_eq!(table.status, TableStatus::Active);
        assert_eq!(table.current_total, 8.5);
        assert!(table.served_items[0].served_at.is_some());
    }

    #[test]
    fn serve_keeps_waiting_status_while_cart_nonempty() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);
        add(&mut state, &catalog, &session, 1, 1, None);
        state.place_order(&session, NOW);
        let order_id = state.orders[0].id;
        // 出餐前又加了新菜
        add(&mut state, &catalog, &session, 3, 1, None);
        state.place_order(&session, NOW);

        state.mark_order_served(order_id, NOW);

        let table = state.table(TableId::new(1).unwrap());
        assert_eq!(table.pending_cart.len(), 1);
        assert_ne!(table.status, TableStatus::Active);
    }

    #[test]
    fn serve_is_idempotent() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);
        add(&mut state, &catalog, &session, 1, 2, None);
        state.place_order(&session, NOW);
        let order_id = state.orders[0].id;

        state.mark_order_served(order_id, NOW);
        let out = state.mark_order_served(order_id, NOW + 1_000);

        assert!(out.is_empty());
        assert_eq!(state.table(TableId::new(1).unwrap()).current_total, 17.0);
    }

    #[test]
    fn guinness_scenario_end_to_end() {
        // 桌 3, Guinness (id 1, 8.50) × 2
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 3);
        add(&mut state, &catalog, &session, 1, 2, None);

        let id = TableId::new(3).unwrap();
        assert_eq!(ledger::calculate_total(&state.table(id).pending_cart), 17.0);

        state.place_order(&session, NOW);
        assert_eq!(state.orders[0].total, 17.0);
        assert_eq!(state.table(id).status, TableStatus::Waiting);

        state.mark_order_served(state.orders[0].id, NOW + 60_000);
        let table = state.table(id);
        assert_eq!(table.current_total, 17.0);
        assert_eq!(table.status, TableStatus::Active);
        assert!(table.pending_cart.is_empty());
    }

    #[test]
    fn call_lifecycle_and_idempotent_attend() {
        let (mut state, _, mut session) = setup();
        join(&mut state, &mut session, 6);

        let out = state.call_waiter(&session, NOW);
        assert!(out.iter().any(|o| matches!(o.event, ServerEvent::NewCall(_))));
        let call_id = state.calls[0].id;

        let out = state.attend_call(call_id, NOW + 10_000);
        assert!(out.iter().any(|o| matches!(o.event, ServerEvent::WaiterArriving)));
        assert_eq!(state.calls[0].status, CallStatus::Attended);

        assert!(state.attend_call(call_id, NOW + 20_000).is_empty());
        assert!(state.attend_call(9999, NOW).is_empty());
    }

    #[test]
    fn bill_splits_per_person() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 7);
        state.set_bill_type(&session, true, Some(vec!["Ana".into(), "Bea".into()]));
        add(&mut state, &catalog, &session, 9, 2, Some(0)); // Fernet 5.00 x2 → Ana
        add(&mut state, &catalog, &session, 9, 1, Some(1)); // Fernet 5.00 x1 → Bea
        let id = TableId::new(7).unwrap();

        let out = state.request_bill(&session, NOW);
        let bill = &state.bills[0];
        assert_eq!(bill.total, 15.0);
        let per_person = bill.per_person.as_ref().unwrap();
        assert_eq!(per_person["Ana"], 10.0);
        assert_eq!(per_person["Bea"], 5.0);
        assert_eq!(state.table(id).status, TableStatus::Paying);
        assert!(out.iter().any(|o| matches!(o.event, ServerEvent::BillPrepared { .. })));
    }

    #[test]
    fn bill_without_split_has_no_per_person() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 8);
        add(&mut state, &catalog, &session, 1, 1, None);

        state.request_bill(&session, NOW);
        assert!(state.bills[0].per_person.is_none());
    }

    #[test]
    fn free_table_resets_from_any_status() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 9);
        state.set_bill_type(&session, true, Some(vec!["Ana".into()]));
        add(&mut state, &catalog, &session, 1, 3, Some(0));
        state.place_order(&session, NOW);
        state.request_bill(&session, NOW);

        let out = state.free_table(9, NOW + 1_000);

        let table = state.table(TableId::new(9).unwrap());
        assert_eq!(table.status, TableStatus::Available);
        assert!(table.is_empty());
        assert!(!table.split);
        assert!(table.people.is_empty());
        assert!(table.consumption_by_person.is_empty());
        assert_eq!(table.current_total, 0.0);
        assert!(table.timestamps.last_order.is_none());
        assert!(out.iter().any(|o| matches!(o.event, ServerEvent::ResetToBillSelection)));

        // Idempotent end state
        state.free_table(9, NOW + 2_000);
        assert_eq!(state.table(TableId::new(9).unwrap()).status, TableStatus::Available);
    }

    #[test]
    fn free_invalid_table_is_noop() {
        let (mut state, _, _) = setup();
        assert!(state.free_table(0, NOW).is_empty());
        assert!(state.free_table(99, NOW).is_empty());
    }

    #[test]
    fn mark_bill_paid_relabels_table() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 10);
        add(&mut state, &catalog, &session, 1, 1, None);
        state.request_bill(&session, NOW);
        let bill_id = state.bills[0].id;

        let out = state.mark_bill_paid(bill_id, NOW + 1_000);

        assert_eq!(state.bills[0].status, BillStatus::Paid);
        let table = state.table(TableId::new(10).unwrap());
        assert_eq!(table.status, TableStatus::PaidButOccupied);
        // 购物车原样保留，只是状态换了标签
        assert_eq!(table.pending_cart.len(), 1);
        assert!(out.iter().any(|o| matches!(
            o.event,
            ServerEvent::CartUpdated(ref s) if s.status == TableStatus::PaidButOccupied
        )));

        assert!(state.mark_bill_paid(bill_id, NOW + 2_000).is_empty());
        assert!(state.mark_bill_paid(12345, NOW).is_empty());
    }

    #[test]
    fn ticker_refreshes_only_live_records() {
        let (mut state, catalog, mut session) = setup();
        join(&mut state, &mut session, 1);
        state.call_waiter(&session, NOW);
        add(&mut state, &catalog, &session, 1, 1, None);
        state.place_order(&session, NOW);

        let call_id = state.calls[0].id;
        state.attend_call(call_id, NOW + 5_000);

        let out = state.refresh_elapsed(NOW + 125_000);
        match out.event {
            ServerEvent::TimesUpdated { calls, orders, .. } => {
                // 已处理的呼叫被过滤掉
                assert!(calls.is_empty());
                assert_eq!(orders.len(), 1);
                assert_eq!(orders[0].elapsed_time, "2m 5s");
            }
            other => panic!("expected TimesUpdated, got {other:?}"),
        }
    }

    #[test]
    fn admin_join_pushes_snapshot_with_fresh_times() {
        let (mut state, _, mut session) = setup();
        let mut customer = Session::new(Uuid::new_v4());
        join(&mut state, &mut customer, 2);
        state.call_waiter(&customer, NOW);

        let out = state.admin_join(&mut session, NOW + 45_000);

        assert!(session.is_admin);
        assert!(matches!(out[0].event, ServerEvent::TimesUpdated { .. }));
        match &out[1].event {
            ServerEvent::AdminConnected(snapshot) => {
                assert_eq!(snapshot.tables.len(), 10);
                assert_eq!(snapshot.calls.len(), 1);
                assert_eq!(snapshot.calls[0].elapsed_time, "45s");
            }
            other => panic!("expected AdminConnected, got {other:?}"),
        }
    }
}

//! 桌台业务模块
//!
//! # 模块结构
//!
//! - [`ledger`] - 金额计算 (Decimal 精度)
//! - [`state`] - 纯状态机: 10 张桌台 + 三类追加记录
//! - [`service`] - 单写者服务: 锁内状态转移，锁外投递
//!
//! 状态转移函数不做任何 I/O，只返回待投递的 [`Outbound`] 列表，
//! 网络层在锁释放后逐条发送。

pub mod ledger;
pub mod service;
pub mod state;

pub use service::VenueService;
pub use state::VenueState;

use shared::message::Room;
use shared::message::payload::ServerEvent;
use shared::models::table::TableId;
use uuid::Uuid;

/// 一个连接的会话身份，由握手请求逐步填充
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub conn_id: Uuid,
    /// join-table 之后绑定的桌号
    pub table: Option<TableId>,
    /// join-as-admin 成功后置位
    pub is_admin: bool,
}

impl Session {
    pub fn new(conn_id: Uuid) -> Self {
        Self {
            conn_id,
            table: None,
            is_admin: false,
        }
    }

    /// 会话当前订阅的房间集合
    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms = Vec::new();
        if let Some(table) = self.table {
            rooms.push(Room::Table(table));
        }
        if self.is_admin {
            rooms.push(Room::Admin);
        }
        rooms
    }
}

/// 事件投递目的地
#[derive(Debug, Clone, PartialEq)]
pub enum Dest {
    /// 只回给发起请求的连接
    Caller,
    /// 广播到一个房间
    Room(Room),
}

/// 状态转移产出的待投递事件
#[derive(Debug, Clone)]
pub struct Outbound {
    pub dest: Dest,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn caller(event: ServerEvent) -> Self {
        Self {
            dest: Dest::Caller,
            event,
        }
    }

    pub fn room(room: Room, event: ServerEvent) -> Self {
        Self {
            dest: Dest::Room(room),
            event,
        }
    }

    pub fn table(table: TableId, event: ServerEvent) -> Self {
        Self::room(Room::Table(table), event)
    }

    pub fn admins(event: ServerEvent) -> Self {
        Self::room(Room::Admin, event)
    }
}

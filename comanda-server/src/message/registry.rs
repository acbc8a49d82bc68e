//! 连接注册表 - 活跃度与房间成员关系
//!
//! 每个 TCP 连接注册一条 [`ConnectionState`]。读循环在每帧到达时
//! 刷新 `last_seen`；后台 sweeper 周期性取消超时连接的 token,
//! 连接任务收到取消后自行清理退出。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::message::{BusMessage, Room};
use shared::types::Timestamp;

/// 单个连接的共享状态，读循环和 forwarder 各持一份 Arc
#[derive(Debug)]
pub struct ConnectionState {
    /// 已加入的房间 (mesa-N / admin-room)
    rooms: RwLock<HashSet<Room>>,
    /// 最后一次收到帧的时刻 (毫秒)
    last_seen: AtomicI64,
    /// 断开此连接的令牌
    pub cancel: CancellationToken,
}

impl ConnectionState {
    fn new(now: Timestamp) -> Self {
        Self {
            rooms: RwLock::new(HashSet::new()),
            last_seen: AtomicI64::new(now),
            cancel: CancellationToken::new(),
        }
    }

    pub fn touch(&self, now: Timestamp) {
        self.last_seen.store(now, Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> Timestamp {
        self.last_seen.load(Ordering::Relaxed)
    }

    /// 整体替换房间集合 (请求处理完后与会话同步)
    pub fn set_rooms(&self, rooms: impl IntoIterator<Item = Room>) {
        *self.rooms.write() = rooms.into_iter().collect();
    }

    pub fn rooms(&self) -> HashSet<Room> {
        self.rooms.read().clone()
    }
}

/// 全部活跃连接
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, Arc<ConnectionState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn_id: Uuid, now: Timestamp) -> Arc<ConnectionState> {
        let state = Arc::new(ConnectionState::new(now));
        self.connections.insert(conn_id, state.clone());
        tracing::debug!(%conn_id, total = self.connections.len(), "Connection registered");
        state
    }

    pub fn remove(&self, conn_id: &Uuid) {
        self.connections.remove(conn_id);
        tracing::debug!(%conn_id, total = self.connections.len(), "Connection removed");
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// 取消所有超时未活动连接的令牌
    ///
    /// 实际的注销由各连接任务在退出路径上完成。
    pub fn sweep_stale(&self, now: Timestamp, stale_after_ms: i64) -> usize {
        let mut swept = 0;
        for entry in self.connections.iter() {
            let idle = now - entry.value().last_seen();
            if idle > stale_after_ms && !entry.value().cancel.is_cancelled() {
                tracing::info!(conn_id = %entry.key(), idle_ms = idle, "Dropping stale connection");
                entry.value().cancel.cancel();
                swept += 1;
            }
        }
        swept
    }
}

/// 判断一条总线消息是否应投递给某个连接
///
/// 规则: 有 target 时只投递给该连接；否则有 room 时投递给房间成员；
/// 两者皆无的消息不投递。
pub fn should_deliver(msg: &BusMessage, conn_id: Uuid, rooms: &HashSet<Room>) -> bool {
    if let Some(target) = msg.target {
        return target == conn_id;
    }
    if let Some(room) = &msg.room {
        return rooms.contains(room);
    }
    false
}

//! 状态快照持久化
//!
//! 进程重启后恢复现场用的 JSON 快照。持久化失败只记日志,
//! 绝不影响在线服务。写入走临时文件 + rename，避免写一半
//! 的文件被下次启动读到。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use shared::models::records::{Bill, Call, Order};
use shared::models::table::Table;
use shared::types::Timestamp;
use shared::util::now_millis;

use crate::venue::state::VenueState;

/// 落盘的状态切片: 桌台全量 + 仍在进行中的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueSnapshot {
    pub tables: Vec<Table>,
    pub calls: Vec<Call>,
    pub orders: Vec<Order>,
    pub bills: Vec<Bill>,
    pub last_backup: Timestamp,
}

impl VenueSnapshot {
    /// 从在线状态导出
    pub fn capture(state: &VenueState) -> Self {
        Self {
            tables: state.tables.clone(),
            calls: state.waiting_calls(),
            orders: state.pending_orders(),
            bills: state.pending_bills(),
            last_backup: now_millis(),
        }
    }

    /// 恢复进在线状态
    ///
    /// 桌台按编号对位合并，编号不合法的条目丢弃。
    pub fn restore_into(self, state: &mut VenueState) {
        for table in self.tables {
            let idx = table.id.index();
            state.tables[idx] = table;
        }
        state.calls = self.calls;
        state.orders = self.orders;
        state.bills = self.bills;
    }
}

/// 快照文件读写
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写快照。失败记日志返回 false，调用方不用管。
    pub async fn save(&self, snapshot: &VenueSnapshot) -> bool {
        let json = match serde_json::to_vec_pretty(snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize snapshot: {}", e);
                return false;
            }
        };

        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            tracing::error!(path = %tmp.display(), "Failed to write snapshot: {}", e);
            return false;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            tracing::error!(path = %self.path.display(), "Failed to move snapshot into place: {}", e);
            return false;
        }

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "Snapshot saved");
        true
    }

    /// 读快照。文件不存在或解析失败都返回 None。
    pub async fn load(&self) -> Option<VenueSnapshot> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No snapshot to restore");
                return None;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), "Failed to read snapshot: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<VenueSnapshot>(&data) {
            Ok(snapshot) => {
                tracing::info!(
                    path = %self.path.display(),
                    tables = snapshot.tables.len(),
                    calls = snapshot.calls.len(),
                    orders = snapshot.orders.len(),
                    bills = snapshot.bills.len(),
                    "Snapshot restored"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), "Corrupt snapshot, starting fresh: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::table::{TableId, TableStatus};

    fn busy_state() -> VenueState {
        use crate::venue::Session;
        use shared::models::menu::MenuCatalog;

        let mut state = VenueState::new(1_704_067_200_000);
        let catalog = MenuCatalog::embedded();
        let mut session = Session::new(uuid::Uuid::new_v4());
        state.join_table(&mut session, 3, 1_704_067_200_000);
        state.add_to_cart(&session, &catalog, 1, Some(2), None, None, 1_704_067_200_000);
        state.place_order(&session, 1_704_067_200_000);
        state.call_waiter(&session, 1_704_067_200_000);
        state
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));

        let state = busy_state();
        assert!(store.save(&VenueSnapshot::capture(&state)).await);

        let restored = store.load().await.unwrap();
        let mut fresh = VenueState::new(0);
        restored.restore_into(&mut fresh);

        let id = TableId::new(3).unwrap();
        assert_eq!(fresh.table(id).status, TableStatus::Waiting);
        assert_eq!(fresh.table(id).pending_cart.len(), 1);
        assert_eq!(fresh.orders.len(), 1);
        assert_eq!(fresh.calls.len(), 1);
    }

    #[tokio::test]
    async fn capture_drops_settled_records() {
        let mut state = busy_state();
        let call_id = state.calls[0].id;
        state.attend_call(call_id, 1_704_067_210_000);

        let snapshot = VenueSnapshot::capture(&state);
        assert!(snapshot.calls.is_empty());
        assert_eq!(snapshot.orders.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nope.json"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = SnapshotStore::new(path);
        assert!(store.load().await.is_none());
    }
}

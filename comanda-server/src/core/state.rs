//! 服务器状态 - 持有所有服务的单例引用
//!
//! ServerState 是整个进程的核心数据结构，HTTP 层和消息层
//! 各拿一份浅拷贝。使用 Arc 共享，克隆成本极低。

use std::sync::Arc;

use shared::models::menu::MenuCatalog;
use shared::types::Timestamp;
use shared::util::now_millis;

use crate::core::Config;
use crate::message::{ConnectionRegistry, MessageBus, TransportConfig};
use crate::snapshot::{SnapshotStore, VenueSnapshot};
use crate::venue::VenueService;

/// 服务器状态
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | catalog | 内嵌菜单目录 |
/// | venue | 业务层 (单写者持锁) |
/// | bus | 消息总线 |
/// | registry | 活跃连接注册表 |
/// | snapshot | 快照读写 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub catalog: Arc<MenuCatalog>,
    pub venue: Arc<VenueService>,
    pub bus: MessageBus,
    pub registry: Arc<ConnectionRegistry>,
    pub snapshot: Arc<SnapshotStore>,
    /// 进程启动时刻 (毫秒)，/health 报告 uptime 用
    pub started_at: Timestamp,
}

impl ServerState {
    /// 初始化全部服务并尽力恢复上次的快照
    pub async fn initialize(config: &Config) -> Self {
        if let Err(e) = config.ensure_work_dir() {
            tracing::error!(
                dir = %config.work_dir,
                "Failed to create work dir, snapshots disabled: {}", e
            );
        }

        let catalog = Arc::new(MenuCatalog::embedded());
        tracing::info!(items = catalog.items().len(), "Menu catalog loaded");

        let venue = Arc::new(VenueService::new(
            catalog.clone(),
            config.admin_password.clone(),
        ));

        let bus = MessageBus::from_config(TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", config.message_tcp_port),
            channel_capacity: 1024,
        });

        let snapshot = Arc::new(SnapshotStore::new(config.snapshot_path()));
        if let Some(restored) = snapshot.load().await {
            venue.with_state_mut(|state| restored.restore_into(state));
        }

        Self {
            config: config.clone(),
            catalog,
            venue,
            bus,
            registry: Arc::new(ConnectionRegistry::new()),
            snapshot,
            started_at: now_millis(),
        }
    }

    /// 捕获并落盘一次快照
    pub async fn persist(&self) -> bool {
        let snapshot = self.venue.with_state(VenueSnapshot::capture);
        self.snapshot.save(&snapshot).await
    }

    pub fn uptime_secs(&self) -> i64 {
        (now_millis() - self.started_at) / 1000
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

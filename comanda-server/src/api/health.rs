//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 进程健康和资源占用 | 无 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "uptime_seconds": 3600,
//!   "connections": 4,
//!   "memory_bytes": 12582912
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | error)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: i64,
    /// 活跃消息连接数
    connections: usize,
    /// 本进程常驻内存 (字节)，读取失败时缺省
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_bytes: Option<u64>,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_secs(),
        connections: state.connection_count(),
        memory_bytes: process_memory(),
    })
}

fn process_memory() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(|p| p.memory())
}

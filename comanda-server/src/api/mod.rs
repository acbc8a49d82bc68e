//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`menu`] - 菜单目录
//! - [`state`] - 店面实时状态只读视图
//!
//! 写操作全部走消息层，HTTP 只提供查询。

pub mod health;
pub mod menu;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// 组装全部路由
pub fn router(server_state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(menu::router())
        .merge(state::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(server_state)
}

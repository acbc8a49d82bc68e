//! 菜单路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/menu | GET | 完整菜单目录 |

use axum::{Json, Router, extract::State, routing::get};

use shared::models::menu::MenuItem;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/menu", get(menu))
}

/// 菜单是编译期内嵌的，直接克隆返回
pub async fn menu(State(state): State<ServerState>) -> Json<Vec<MenuItem>> {
    Json(state.catalog.items().to_vec())
}

//! Comanda Server - 酒吧桌台点单实时服务端
//!
//! # 架构概述
//!
//! 单店部署的实时服务端，客户扫码进入桌台房间下单，
//! 员工面板通过 admin 房间接收呼叫、订单和账单：
//!
//! - **消息总线** (`message`): TCP/Memory 传输的实时消息系统
//! - **桌台服务** (`venue`): 单写者持有全部桌台状态
//! - **快照持久化** (`snapshot`): 工作目录下的 JSON 快照
//! - **HTTP API** (`api`): 只读查询接口
//!
//! # 模块结构
//!
//! ```text
//! comanda-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── venue/         # 桌台状态机和业务处理
//! ├── message/       # 消息总线、连接注册表
//! ├── snapshot.rs    # 状态快照持久化
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志等工具
//! ```

pub mod api;
pub mod core;
pub mod message;
pub mod snapshot;
pub mod utils;
pub mod venue;

// Re-export 公共类型
pub use core::{Config, Result, Server, ServerError, ServerState};
pub use message::{ConnectionRegistry, MessageBus};
pub use shared::message::{BusMessage, EventType, Room};
pub use venue::VenueService;

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
pub use utils::setup_environment;

pub fn print_banner() {
    println!(
        r#"
   ______                                __
  / ____/___  ____ ___  ____ _____  ____/ /___ _
 / /   / __ \/ __ `__ \/ __ `/ __ \/ __  / __ `/
/ /___/ /_/ / / / / / / /_/ / / / / /_/ / /_/ /
\____/\____/_/ /_/ /_/\__,_/_/ /_/\__,_/\__,_/
    "#
    );
}

//! 工具模块 - 日志和进程环境初始化

pub mod logger;

pub use logger::{init_logger, init_logger_with_file};

use crate::core::Result;

/// 加载 .env 并初始化日志
///
/// | 环境变量 | 说明 |
/// |----------|------|
/// | `LOG_LEVEL` | trace / debug / info / warn / error (默认 info) |
/// | `LOG_DIR` | 设置后按天滚动写日志文件 |
pub fn setup_environment() -> Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

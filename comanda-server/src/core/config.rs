use std::path::PathBuf;

/// 服务器配置 - 单店部署的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/comanda | 工作目录 (快照、日志) |
/// | HTTP_PORT | 3003 | HTTP 服务端口 |
/// | MESSAGE_TCP_PORT | 8081 | TCP 消息总线端口 |
/// | ADMIN_PASSWORD | admin123 | 员工面板口令 |
/// | AUTOSAVE_INTERVAL_SECS | 30 | 快照自动保存间隔(秒) |
/// | SWEEP_INTERVAL_SECS | 60 | 失联连接清扫间隔(秒) |
/// | STALE_AFTER_SECS | 300 | 连接视为失联的静默时长(秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/comanda HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储快照、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 消息总线端口 (用于客户端直连)
    pub message_tcp_port: u16,
    /// 员工面板口令
    pub admin_password: String,
    /// 快照自动保存间隔 (秒)
    pub autosave_interval_secs: u64,
    /// 失联连接清扫间隔 (秒)
    pub sweep_interval_secs: u64,
    /// 连接视为失联的静默时长 (秒)
    pub stale_after_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/comanda".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3003),
            message_tcp_port: std::env::var("MESSAGE_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            admin_password: std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
            autosave_interval_secs: std::env::var("AUTOSAVE_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            stale_after_secs: std::env::var("STALE_AFTER_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    /// 快照文件路径
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("snapshot.json")
    }

    /// 确保工作目录存在
    pub fn ensure_work_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

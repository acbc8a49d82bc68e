//! 消息总线核心实现
//!
//! 单一 broadcast 通道承载所有服务器发出的房间事件。
//! 每个连接的 forwarder 订阅后按自己加入的房间过滤投递，
//! Caller 定向事件不经过总线，由连接任务直接回写。

use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::transport::MemoryTransport;
use crate::core::ServerError;

/// Configuration for transport layer
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 消息总线 - 负责服务器事件的扇出
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到客户端的广播通道
    server_tx: broadcast::Sender<BusMessage>,
    /// 传输层配置
    pub(crate) config: TransportConfig,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
}

impl MessageBus {
    /// 创建默认配置的消息总线
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    /// 从配置创建消息总线
    pub fn from_config(config: TransportConfig) -> Self {
        let (server_tx, _) = broadcast::channel(config.channel_capacity);
        Self {
            server_tx,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 发布消息 (服务器 -> 订阅者)
    ///
    /// 没有任何活跃连接时发送会失败，对我们来说不算错误。
    pub fn publish(&self, msg: BusMessage) -> Result<(), ServerError> {
        match self.server_tx.send(msg) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// 订阅服务器广播
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 获取内存传输层 (测试用)
    pub fn memory_transport(&self) -> MemoryTransport {
        MemoryTransport::new(&self.server_tx)
    }

    /// 获取广播发送端 (高级用法)
    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.server_tx
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 监听地址
    pub fn listen_addr(&self) -> &str {
        &self.config.tcp_listen_addr
    }

    /// 优雅关闭消息总线
    ///
    /// 取消所有运行中的任务，包括 TCP 服务器
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

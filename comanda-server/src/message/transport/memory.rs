//! Memory 传输层实现 (同进程通信)

use std::sync::Arc;

use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use super::Transport;
use crate::core::ServerError;

/// 同进程内存传输，基于 tokio broadcast 通道。
///
/// 用于测试，不经过网络栈。
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    tx: Option<Arc<broadcast::Sender<BusMessage>>>,
}

impl MemoryTransport {
    /// 订阅服务器广播
    pub fn new(tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(tx.subscribe())),
            tx: None,
        }
    }

    /// 订阅广播并附带回写端 (模拟客户端发消息)
    pub fn with_sender(
        broadcast_tx: &broadcast::Sender<BusMessage>,
        client_tx: &broadcast::Sender<BusMessage>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(broadcast_tx.subscribe())),
            tx: Some(Arc::new(client_tx.clone())),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, ServerError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| ServerError::internal(e.to_string()))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), ServerError> {
        if let Some(tx) = &self.tx {
            tx.send(msg.clone())
                .map_err(|e| ServerError::internal(e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ServerError> {
        Ok(())
    }
}

//! Transport 传输层抽象
//!
//! 提供可插拔的传输层架构：
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │
//!         ┌────────┴────────┐
//!         ▼                 ▼
//!   TcpTransport      MemoryTransport
//!   (TCP 协议)        (同进程通信)
//! ```

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::{BusMessage, EventType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::core::ServerError;

/// Transport 传输层特征
///
/// 所有传输实现必须实现此特征，支持消息的读写和连接管理。
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// 从传输层读取一条消息
    async fn read_message(&self) -> Result<BusMessage, ServerError>;

    /// 向传输层写入一条消息
    async fn write_message(&self, msg: &BusMessage) -> Result<(), ServerError>;

    /// 关闭传输连接
    async fn close(&self) -> Result<(), ServerError>;

    /// 获取对端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== 帧格式 ==========
//
// [事件类型 1 字节][载荷长度 4 字节 LE][JSON 载荷]
//
// room/target 是进程内路由元数据，不上线。

/// 单帧载荷上限 (1 MiB)，防御畸形长度字段
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// 从异步流中读取 BusMessage
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, ServerError> {
    // 读取事件类型 (1 字节)
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ServerError::ClientDisconnected);
        }
        Err(e) => {
            return Err(ServerError::internal(format!("Read type failed: {}", e)));
        }
    }

    let event_type = EventType::try_from(type_buf[0])
        .map_err(|_| ServerError::validation("Invalid event type"))?;

    // 读取载荷长度 (4 字节)
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| ServerError::internal(format!("Read len failed: {}", e)))?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ServerError::validation(format!(
            "Frame too large: {} bytes",
            len
        )));
    }

    // 读取载荷内容
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| ServerError::internal(format!("Read payload failed: {}", e)))?;

    Ok(BusMessage::new(event_type, payload))
}

/// 向异步流写入 BusMessage
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), ServerError> {
    let mut data = Vec::with_capacity(5 + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer
        .write_all(&data)
        .await
        .map_err(|e| ServerError::internal(format!("Write failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::payload::ServerEvent;

    #[tokio::test]
    async fn frame_round_trip_preserves_type_and_payload() {
        let msg = BusMessage::event(&ServerEvent::Pong {
            time: 1_704_067_200_000,
        })
        .unwrap();

        let (mut client, mut server) = tokio::io::duplex(4096);
        write_to_stream(&mut client, &msg).await.unwrap();

        let decoded = read_from_stream(&mut server).await.unwrap();
        assert_eq!(decoded.event_type, EventType::Event);
        assert_eq!(decoded.payload, msg.payload);
        // 路由元数据不上线
        assert!(decoded.room.is_none());
        assert!(decoded.target.is_none());
    }

    #[tokio::test]
    async fn eof_maps_to_disconnect() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let err = read_from_stream(&mut server).await.unwrap_err();
        assert!(matches!(err, ServerError::ClientDisconnected));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let mut data = vec![EventType::Request as u8];
            data.extend_from_slice(&u32::MAX.to_le_bytes());
            let _ = client.write_all(&data).await;
        });

        let err = read_from_stream(&mut server).await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }
}

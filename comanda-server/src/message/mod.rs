//! 消息层 - 传输抽象 + 总线 + 连接注册表
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>  (server → rooms)  │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │    Transport Trait  │  ◄── 可插拔实现
//!               └──────────┬──────────┘
//!                          │
//!            ┌─────────────┴─────────────┐
//!            ▼                           ▼
//!       TcpTransport              MemoryTransport
//!       (TCP 明文)                (同进程/测试)
//! ```
//!
//! # 消息流
//!
//! ```text
//! Client ──▶ read loop ──▶ VenueService::handle ──┬─▶ Caller: 直接回写
//!                                                 └─▶ Room:   publish()
//!                                                          │
//!                                              per-connection forwarder
//!                                              (按 room/target 过滤后投递)
//! ```
//!
//! room/target 元数据只存在于进程内的 broadcast 通道里,
//! 不随帧上线: 线上帧只有事件类型 + 载荷。

pub mod bus;
pub mod registry;
pub mod server;
pub mod transport;

pub use bus::{MessageBus, TransportConfig};
pub use registry::{ConnectionRegistry, ConnectionState, should_deliver};
pub use server::MessageServer;
pub use shared::message::{BusMessage, EventType, Room};
pub use transport::{MemoryTransport, TcpTransport, Transport};

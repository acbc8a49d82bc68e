//! TCP 服务器实现
//!
//! 每个连接两个任务：
//! - forwarder: 订阅总线，按 room/target 过滤后写给客户端
//! - read loop: 解析请求帧，直接调用业务层分发，Caller 事件就地回写
//!
//! 读循环持有连接私有的 [`Session`]，房间变化在每次请求处理后
//! 同步进注册表，forwarder 通过注册表看到最新的成员关系。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::message::payload::{ClientRequest, ServerEvent};
use shared::message::{BusMessage, EventType};
use shared::util::now_millis;

use super::bus::MessageBus;
use super::registry::{ConnectionRegistry, ConnectionState, should_deliver};
use super::transport::{TcpTransport, Transport};
use crate::core::{Result, ServerError};
use crate::venue::{Dest, Session, VenueService};

/// 消息服务器 - 总线 + 业务层 + 注册表的组装
#[derive(Clone)]
pub struct MessageServer {
    bus: MessageBus,
    venue: Arc<VenueService>,
    registry: Arc<ConnectionRegistry>,
}

impl MessageServer {
    pub fn new(bus: MessageBus, venue: Arc<VenueService>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { bus, venue, registry }
    }

    /// 启动 TCP 服务器并阻塞在 accept 循环上
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.bus.listen_addr())
            .await
            .map_err(|e| ServerError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!("Message server listening on {}", self.bus.listen_addr());

        loop {
            tokio::select! {
                _ = self.bus.shutdown_token().cancelled() => {
                    tracing::info!("Message server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let bus = self.bus.clone();
        let venue = self.venue.clone();
        let registry = self.registry.clone();

        tokio::spawn(async move {
            handle_client_connection(stream, addr, bus, venue, registry).await;
        });
    }
}

/// 单连接生命周期
async fn handle_client_connection(
    stream: TcpStream,
    addr: SocketAddr,
    bus: MessageBus,
    venue: Arc<VenueService>,
    registry: Arc<ConnectionRegistry>,
) {
    let conn_id = Uuid::new_v4();
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));
    let conn = registry.register(conn_id, now_millis());

    let forward_handle = spawn_forwarder(
        transport.clone(),
        bus.subscribe(),
        bus.shutdown_token().clone(),
        conn_id,
        conn.clone(),
    );

    read_client_messages(&transport, &bus, &venue, conn_id, &conn, addr).await;

    // 退出路径: 叫停 forwarder，注销连接
    conn.cancel.cancel();
    forward_handle.abort();
    let _ = transport.close().await;
    registry.remove(&conn_id);
    tracing::debug!(%conn_id, "Client {} cleaned up", addr);
}

/// 服务器广播 → 本连接 (按房间/定向过滤)
fn spawn_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    conn_id: Uuid,
    conn: Arc<ConnectionState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    break;
                }
                _ = conn.cancel.cancelled() => {
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            if !should_deliver(&msg, conn_id, &conn.rooms()) {
                                continue;
                            }
                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(%conn_id, "Client write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // 客户端落后于广播通道，丢帧继续
                            tracing::warn!(%conn_id, dropped = n, "Client lagged behind bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(%conn_id, "Client forwarder stopped");
    })
}

/// 客户端帧 → 业务层
async fn read_client_messages(
    transport: &Arc<dyn Transport>,
    bus: &MessageBus,
    venue: &Arc<VenueService>,
    conn_id: Uuid,
    conn: &Arc<ConnectionState>,
    addr: SocketAddr,
) {
    let mut session = Session::new(conn_id);

    loop {
        tokio::select! {
            _ = conn.cancel.cancelled() => {
                tracing::debug!(%conn_id, "Client {} dropped as stale", addr);
                break;
            }

            read_result = transport.read_message() => {
                let msg = match read_result {
                    Ok(msg) => msg,
                    Err(ServerError::ClientDisconnected) => {
                        tracing::debug!(%conn_id, "Client {} disconnected", addr);
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, "Client {} read error: {}", addr, e);
                        break;
                    }
                };

                conn.touch(now_millis());

                if msg.event_type != EventType::Request {
                    tracing::warn!(%conn_id, event_type = %msg.event_type, "Dropping non-request frame from client");
                    continue;
                }

                let request: ClientRequest = match msg.parse_payload() {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::debug!(%conn_id, "Malformed request payload: {}", e);
                        write_event(transport, conn_id, &ServerEvent::Error {
                            message: "Malformed request".into(),
                        })
                        .await;
                        continue;
                    }
                };

                let outbound = venue.handle(request, &mut session);
                conn.set_rooms(session.rooms());

                for out in outbound {
                    match out.dest {
                        Dest::Caller => {
                            write_event(transport, conn_id, &out.event).await;
                        }
                        Dest::Room(room) => {
                            match BusMessage::event(&out.event) {
                                Ok(bus_msg) => {
                                    if let Err(e) = bus.publish(bus_msg.to_room(room)) {
                                        tracing::error!(%conn_id, "Failed to publish event: {}", e);
                                    }
                                }
                                Err(e) => {
                                    tracing::error!(%conn_id, "Failed to encode event: {}", e);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// 定向回写一条事件给本连接
async fn write_event(transport: &Arc<dyn Transport>, conn_id: Uuid, event: &ServerEvent) {
    match BusMessage::event(event) {
        Ok(msg) => {
            if let Err(e) = transport.write_message(&msg).await {
                tracing::debug!(%conn_id, "Failed to write event to client: {}", e);
            }
        }
        Err(e) => {
            tracing::error!(%conn_id, "Failed to encode event: {}", e);
        }
    }
}

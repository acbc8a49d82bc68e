//! 消息总线消息类型定义
//!
//! 这些类型在 comanda-server 和 clients 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::models::table::{InvalidTableId, TableId};

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 消息方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 客户端请求
    Request = 0,
    /// 服务端事件
    Event = 1,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Request),
            1 => Ok(EventType::Event),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Request => write!(f, "request"),
            EventType::Event => write!(f, "event"),
        }
    }
}

/// Broadcast room a connection can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Room {
    /// 单张桌台的房间 (`mesa-<n>`)
    Table(TableId),
    /// 员工面板房间 (`admin-room`)
    Admin,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseRoomError {
    #[error("unknown room: {0}")]
    Unknown(String),
    #[error(transparent)]
    Table(#[from] InvalidTableId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Table(id) => write!(f, "mesa-{}", id),
            Room::Admin => write!(f, "admin-room"),
        }
    }
}

impl FromStr for Room {
    type Err = ParseRoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "admin-room" {
            return Ok(Room::Admin);
        }
        if let Some(n) = s.strip_prefix("mesa-") {
            let id: i64 = n
                .parse()
                .map_err(|_| ParseRoomError::Unknown(s.to_string()))?;
            return Ok(Room::Table(TableId::try_from(id)?));
        }
        Err(ParseRoomError::Unknown(s.to_string()))
    }
}

impl From<Room> for String {
    fn from(room: Room) -> String {
        room.to_string()
    }
}

impl TryFrom<String> for Room {
    type Error = ParseRoomError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// 消息总线消息体
///
/// `room` 与 `target` 控制投递范围: 指定 `target` 时只送往该连接，
/// 指定 `room` 时送往订阅了该房间的所有连接，两者皆空则全量广播。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub id: Uuid,
    pub event_type: EventType,
    pub room: Option<Room>,
    pub target: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            room: None,
            target: None,
            payload,
        }
    }

    /// 创建客户端请求消息
    pub fn request(payload: &ClientRequest) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Request, serde_json::to_vec(payload)?))
    }

    /// 创建服务端事件消息
    pub fn event(payload: &ServerEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Event, serde_json::to_vec(payload)?))
    }

    /// 限定投递到某个房间
    pub fn to_room(mut self, room: Room) -> Self {
        self.room = Some(room);
        self
    }

    /// 限定投递到单个连接
    pub fn to_target(mut self, target: Uuid) -> Self {
        self.target = Some(target);
        self
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

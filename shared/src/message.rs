//! 实时通道消息封装
//!
//! 服务端与客户端之间的持久连接协议。每条帧是一个 [`BusMessage`]：
//!
//! ```text
//! Client ──▶ Handshake ──▶ 凭证校验 ──▶ HandshakeAck (自动加入房间)
//!                                   └─▶ Refused + 断开
//! Client ──▶ JoinRoom / LeaveRoom ──▶ Ack (按 correlation_id 关联)
//! Server ──▶ Event (ServerEvent 载荷) ──▶ 房间内所有连接
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    /// 连接后的首帧，携带凭证
    Handshake = 0,
    /// 握手通过，载荷为分配的连接信息
    HandshakeAck = 1,
    /// 握手拒绝，随后连接关闭
    Refused = 2,
    /// 服务端推送事件
    Event = 3,
    /// 客户端请求加入房间
    JoinRoom = 4,
    /// 客户端请求离开房间
    LeaveRoom = 5,
    /// 对 JoinRoom/LeaveRoom 的确认
    Ack = 6,
}

impl TryFrom<u8> for FrameType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameType::Handshake),
            1 => Ok(FrameType::HandshakeAck),
            2 => Ok(FrameType::Refused),
            3 => Ok(FrameType::Event),
            4 => Ok(FrameType::JoinRoom),
            5 => Ok(FrameType::LeaveRoom),
            6 => Ok(FrameType::Ack),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Handshake => write!(f, "handshake"),
            FrameType::HandshakeAck => write!(f, "handshake_ack"),
            FrameType::Refused => write!(f, "refused"),
            FrameType::Event => write!(f, "event"),
            FrameType::JoinRoom => write!(f, "join_room"),
            FrameType::LeaveRoom => write!(f, "leave_room"),
            FrameType::Ack => write!(f, "ack"),
        }
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub frame_type: FrameType,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            frame_type,
            correlation_id: None,
            payload,
        }
    }

    /// 设置关联 ID (Ack 关联请求)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手帧
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            FrameType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    /// 创建握手确认帧
    pub fn handshake_ack(payload: &HandshakeAckPayload) -> Self {
        Self::new(
            FrameType::HandshakeAck,
            serde_json::to_vec(payload).expect("Failed to serialize handshake ack"),
        )
    }

    /// 创建拒绝帧
    pub fn refused(message: &str) -> Self {
        Self::new(
            FrameType::Refused,
            serde_json::to_vec(&RefusedPayload {
                message: message.to_string(),
            })
            .expect("Failed to serialize refusal"),
        )
    }

    /// 创建事件帧
    pub fn event(event: &crate::event::ServerEvent) -> Self {
        Self::new(
            FrameType::Event,
            serde_json::to_vec(event).expect("Failed to serialize server event"),
        )
    }

    /// 创建加入房间帧
    pub fn join_room(room: &Room) -> Self {
        Self::new(
            FrameType::JoinRoom,
            serde_json::to_vec(&RoomPayload {
                room: room.to_string(),
            })
            .expect("Failed to serialize room payload"),
        )
    }

    /// 创建离开房间帧
    pub fn leave_room(room: &Room) -> Self {
        Self::new(
            FrameType::LeaveRoom,
            serde_json::to_vec(&RoomPayload {
                room: room.to_string(),
            })
            .expect("Failed to serialize room payload"),
        )
    }

    /// 创建确认帧
    pub fn ack(correlation_id: Uuid, ok: bool, message: Option<String>) -> Self {
        Self::new(
            FrameType::Ack,
            serde_json::to_vec(&AckPayload { ok, message }).expect("Failed to serialize ack"),
        )
        .with_correlation_id(correlation_id)
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

// ==================== Handshake ====================

/// 握手凭证 — 员工用 REST 同款 bearer JWT，客人用会话令牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Staff { token: String },
    Customer { session_token: String },
}

/// 握手载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub version: u16,
    pub credential: Credential,
    pub client_name: Option<String>,
}

/// 握手确认载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeAckPayload {
    /// 服务端分配的连接 ID
    pub conn_id: String,
    /// 握手后自动加入的房间
    pub rooms: Vec<String>,
}

/// 拒绝载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefusedPayload {
    pub message: String,
}

/// 房间载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: String,
}

/// 确认载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    pub ok: bool,
    pub message: Option<String>,
}

// ==================== Rooms ====================

/// 房间 — 实时通道内的命名多播组
///
/// 不是自由字符串：能表达的房间就是这三类，
/// 加入请求在服务端按连接主体做授权检查。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// 全体已审批员工 (订单看板)
    Staff,
    /// 单张桌台
    Table(u32),
    /// 单个用户的定向通道 (不可显式加入)
    User(String),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Staff => write!(f, "staff"),
            Room::Table(n) => write!(f, "table:{n}"),
            Room::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl FromStr for Room {
    type Err = RoomParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "staff" {
            return Ok(Room::Staff);
        }
        if let Some(num) = s.strip_prefix("table:") {
            let n: u32 = num
                .parse()
                .map_err(|_| RoomParseError(s.to_string()))?;
            if n == 0 {
                return Err(RoomParseError(s.to_string()));
            }
            return Ok(Room::Table(n));
        }
        if let Some(id) = s.strip_prefix("user:") {
            if id.is_empty() {
                return Err(RoomParseError(s.to_string()));
            }
            return Ok(Room::User(id.to_string()));
        }
        Err(RoomParseError(s.to_string()))
    }
}

/// 无法解析的房间名
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown room name: {0}")]
pub struct RoomParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_round_trip() {
        for room in [Room::Staff, Room::Table(7), Room::User("employee:9".into())] {
            let parsed: Room = room.to_string().parse().unwrap();
            assert_eq!(parsed, room);
        }
    }

    #[test]
    fn test_room_rejects_garbage() {
        assert!("lounge".parse::<Room>().is_err());
        assert!("table:0".parse::<Room>().is_err());
        assert!("table:abc".parse::<Room>().is_err());
        assert!("user:".parse::<Room>().is_err());
    }

    #[test]
    fn test_ack_carries_correlation() {
        let req = BusMessage::join_room(&Room::Table(3));
        let ack = BusMessage::ack(req.request_id, true, None);
        assert_eq!(ack.correlation_id, Some(req.request_id));
        let payload: AckPayload = ack.parse_payload().unwrap();
        assert!(payload.ok);
    }

    #[test]
    fn test_handshake_payload_round_trip() {
        let msg = BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            credential: Credential::Customer {
                session_token: "abc123".to_string(),
            },
            client_name: Some("foh-client".to_string()),
        });
        assert_eq!(msg.frame_type, FrameType::Handshake);
        let parsed: HandshakePayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.version, PROTOCOL_VERSION);
    }
}

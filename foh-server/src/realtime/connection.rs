//! 单连接服务循环
//!
//! 每条接入的传输连接走同一条路径：握手 → 注册 →
//! (writer 任务 + 读循环) → 注销。握手失败时显式回写
//! Refused 再关闭，不做静默丢弃。

use std::sync::Arc;
use std::time::Duration;

use shared::message::{
    BusMessage, Credential, FrameType, HandshakeAckPayload, HandshakePayload, Room,
    PROTOCOL_VERSION,
};
use shared::transport::{Transport, TransportError};

use crate::auth::JwtService;
use crate::db::repository::TableSessionRepository;
use crate::realtime::bus::{EventBus, Principal};
use crate::security_log;

/// 握手首帧的等待上限
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// 握手凭证校验器
///
/// 员工凭证是 REST 同款 JWT；客人凭证是会话令牌，
/// 必须对应一个仍然活跃的桌台会话。
#[derive(Clone)]
pub struct HandshakeAuth {
    jwt: Arc<JwtService>,
    sessions: TableSessionRepository,
}

impl HandshakeAuth {
    pub fn new(jwt: Arc<JwtService>, sessions: TableSessionRepository) -> Self {
        Self { jwt, sessions }
    }

    /// 校验凭证，返回连接主体
    pub async fn authenticate(&self, credential: &Credential) -> Result<Principal, String> {
        match credential {
            Credential::Staff { token } => {
                let claims = self
                    .jwt
                    .validate_token(token)
                    .map_err(|e| format!("Invalid staff credential: {e}"))?;
                Ok(Principal::Staff {
                    user_id: claims.sub,
                    role: claims.role,
                    approved: claims.is_approved,
                })
            }
            Credential::Customer { session_token } => {
                let session = self
                    .sessions
                    .find_by_token(session_token)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "Session lookup failed during handshake");
                        "Session lookup failed".to_string()
                    })?
                    .ok_or_else(|| "Unknown session token".to_string())?;
                if !session.is_active {
                    return Err("Session has expired".to_string());
                }
                Ok(Principal::Customer {
                    table_number: session.table_number,
                })
            }
        }
    }
}

/// 服务一条连接直到断开
///
/// 调用方 (TCP 接入循环或测试) 在独立任务中运行本函数。
pub async fn serve_connection(
    bus: Arc<EventBus>,
    auth: HandshakeAuth,
    transport: Arc<dyn Transport>,
) {
    let peer = transport.peer_addr().unwrap_or_else(|| "unknown".to_string());

    // ========== 握手 ==========
    let principal = match handshake(&auth, transport.as_ref(), &peer).await {
        Ok(p) => p,
        Err(reason) => {
            security_log!(
                "WARN",
                "bus_handshake_refused",
                peer = peer.clone(),
                reason = reason.clone()
            );
            let _ = transport.write_message(&BusMessage::refused(&reason)).await;
            let _ = transport.close().await;
            return;
        }
    };

    let (conn_id, mut rx) = bus.register(principal);
    let rooms: Vec<String> = bus
        .rooms_of(&conn_id)
        .iter()
        .map(|r| r.to_string())
        .collect();
    let ack = BusMessage::handshake_ack(&HandshakeAckPayload {
        conn_id: conn_id.clone(),
        rooms,
    });
    if transport.write_message(&ack).await.is_err() {
        bus.unregister(&conn_id);
        let _ = transport.close().await;
        return;
    }
    tracing::info!(conn_id = %conn_id, peer = %peer, "Bus connection established");

    // ========== writer 任务 ==========
    // 队列到传输的单向搬运；队列关闭或写失败即退出
    let writer_transport = transport.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer_transport.write_message(&msg).await {
                tracing::debug!(error = %e, "Bus write failed, stopping writer");
                break;
            }
        }
        let _ = writer_transport.close().await;
    });

    // ========== 读循环 ==========
    let shutdown = bus.shutdown_token().clone();
    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = transport.read_message() => match result {
                Ok(msg) => msg,
                Err(TransportError::Disconnected) | Err(TransportError::Closed) => break,
                Err(e) => {
                    tracing::warn!(conn_id = %conn_id, error = %e, "Bus read error");
                    break;
                }
            },
        };

        match msg.frame_type {
            FrameType::JoinRoom | FrameType::LeaveRoom => {
                let ack = handle_room_request(&bus, &conn_id, &msg);
                if transport.write_message(&ack).await.is_err() {
                    break;
                }
            }
            other => {
                tracing::debug!(conn_id = %conn_id, frame = %other, "Ignoring unexpected frame");
            }
        }
    }

    bus.unregister(&conn_id);
    writer.abort();
    let _ = transport.close().await;
    tracing::info!(conn_id = %conn_id, "Bus connection closed");
}

/// 等待并校验首帧握手
async fn handshake(
    auth: &HandshakeAuth,
    transport: &dyn Transport,
    peer: &str,
) -> Result<Principal, String> {
    let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, transport.read_message())
        .await
        .map_err(|_| "Handshake timed out".to_string())?
        .map_err(|e| format!("Handshake read failed: {e}"))?;

    if first.frame_type != FrameType::Handshake {
        return Err(format!("Expected handshake, got {}", first.frame_type));
    }

    let payload: HandshakePayload = first
        .parse_payload()
        .map_err(|e| format!("Malformed handshake payload: {e}"))?;

    if payload.version != PROTOCOL_VERSION {
        return Err(format!(
            "Unsupported protocol version {} (expected {})",
            payload.version, PROTOCOL_VERSION
        ));
    }

    tracing::debug!(
        peer = %peer,
        client = payload.client_name.as_deref().unwrap_or("-"),
        "Handshake received"
    );
    auth.authenticate(&payload.credential).await
}

/// 处理 JoinRoom / LeaveRoom，返回关联 Ack
fn handle_room_request(bus: &EventBus, conn_id: &str, msg: &BusMessage) -> BusMessage {
    let room: Room = match msg
        .parse_payload::<shared::message::RoomPayload>()
        .map_err(|e| e.to_string())
        .and_then(|p| p.room.parse().map_err(|e: shared::message::RoomParseError| e.to_string()))
    {
        Ok(room) => room,
        Err(reason) => return BusMessage::ack(msg.request_id, false, Some(reason)),
    };

    let result = match msg.frame_type {
        FrameType::JoinRoom => bus.join(conn_id, room),
        _ => bus.leave(conn_id, room),
    };

    match result {
        Ok(()) => BusMessage::ack(msg.request_id, true, None),
        Err(e) => {
            security_log!(
                "WARN",
                "bus_room_denied",
                conn_id = conn_id.to_string(),
                reason = e.to_string()
            );
            BusMessage::ack(msg.request_id, false, Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::transport::MemoryTransport;

    async fn test_auth() -> HandshakeAuth {
        let db = DbService::memory().await.unwrap();
        HandshakeAuth::new(
            Arc::new(JwtService::new()),
            TableSessionRepository::new(db.db.clone()),
        )
    }

    #[tokio::test]
    async fn test_non_handshake_first_frame_is_refused() {
        let bus = Arc::new(EventBus::new());
        let auth = test_auth().await;
        let (server_side, client_side) = MemoryTransport::pair();

        let task = tokio::spawn(serve_connection(
            bus.clone(),
            auth,
            Arc::new(server_side),
        ));

        client_side
            .write_message(&BusMessage::join_room(&Room::Staff))
            .await
            .unwrap();
        let reply = client_side.read_message().await.unwrap();
        assert_eq!(reply.frame_type, FrameType::Refused);
        task.await.unwrap();
        assert_eq!(bus.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_session_token_is_refused() {
        let bus = Arc::new(EventBus::new());
        let auth = test_auth().await;
        let (server_side, client_side) = MemoryTransport::pair();

        tokio::spawn(serve_connection(bus.clone(), auth, Arc::new(server_side)));

        client_side
            .write_message(&BusMessage::handshake(&HandshakePayload {
                version: PROTOCOL_VERSION,
                credential: Credential::Customer {
                    session_token: "no-such-token".to_string(),
                },
                client_name: None,
            }))
            .await
            .unwrap();
        let reply = client_side.read_message().await.unwrap();
        assert_eq!(reply.frame_type, FrameType::Refused);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_refused() {
        let bus = Arc::new(EventBus::new());
        let auth = test_auth().await;
        let (server_side, client_side) = MemoryTransport::pair();

        tokio::spawn(serve_connection(bus.clone(), auth, Arc::new(server_side)));

        client_side
            .write_message(&BusMessage::handshake(&HandshakePayload {
                version: PROTOCOL_VERSION + 1,
                credential: Credential::Customer {
                    session_token: "whatever".to_string(),
                },
                client_name: None,
            }))
            .await
            .unwrap();
        let reply = client_side.read_message().await.unwrap();
        assert_eq!(reply.frame_type, FrameType::Refused);
    }
}

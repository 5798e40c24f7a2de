//! 实时通道客户端
//!
//! 一个 [`BusClient`] 对应一条握手成功的连接。事件在传输边界
//! 解码一次成 [`ServerEvent`]；解不开的帧记日志后丢弃，
//! 不会传染给订阅者。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::event::ServerEvent;
use shared::message::{
    AckPayload, BusMessage, Credential, FrameType, HandshakeAckPayload, HandshakePayload,
    RefusedPayload, Room, PROTOCOL_VERSION,
};
use shared::transport::{TcpTransport, Transport, TransportError};
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{ClientError, ClientResult};

/// 握手与房间请求的应答等待上限
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 事件订阅句柄
///
/// 显式持有才收事件；drop (或调用 [`Subscription::unsubscribe`])
/// 即退订。没有环境全局的回调注册表。
pub struct Subscription {
    rx: broadcast::Receiver<ServerEvent>,
}

impl Subscription {
    /// 等待下一个事件
    ///
    /// 落后于广播缓冲时跳过丢失的事件继续 (调用方靠周期性
    /// 全量拉取自愈)；通道关闭返回 [`ClientError::Disconnected`]。
    pub async fn recv(&mut self) -> ClientResult<ServerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Subscription lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ClientError::Disconnected);
                }
            }
        }
    }

    /// 显式退订
    pub fn unsubscribe(self) {}
}

/// Realtime bus client
#[derive(Debug)]
pub struct BusClient {
    transport: Arc<dyn Transport>,
    events_tx: broadcast::Sender<ServerEvent>,
    pending: Arc<Mutex<HashMap<Uuid, oneshot::Sender<AckPayload>>>>,
    conn_id: String,
    rooms: Vec<String>,
    closed: CancellationToken,
}

impl BusClient {
    /// TCP 连接并握手
    pub async fn connect(
        addr: &str,
        credential: Credential,
        client_name: &str,
    ) -> ClientResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::connect(addr).await?);
        Self::over_transport(transport, credential, client_name).await
    }

    /// 在已有传输上握手 (内存传输测试用)
    pub async fn over_transport(
        transport: Arc<dyn Transport>,
        credential: Credential,
        client_name: &str,
    ) -> ClientResult<Self> {
        transport
            .write_message(&BusMessage::handshake(&HandshakePayload {
                version: PROTOCOL_VERSION,
                credential,
                client_name: Some(client_name.to_string()),
            }))
            .await?;

        let reply = tokio::time::timeout(REQUEST_TIMEOUT, transport.read_message())
            .await
            .map_err(|_| ClientError::Timeout("Handshake timed out".to_string()))??;

        let ack: HandshakeAckPayload = match reply.frame_type {
            FrameType::HandshakeAck => reply.parse_payload()?,
            FrameType::Refused => {
                let refusal: RefusedPayload = reply.parse_payload()?;
                return Err(ClientError::Refused(refusal.message));
            }
            other => {
                return Err(ClientError::InvalidResponse(format!(
                    "Expected handshake ack, got {other}"
                )));
            }
        };
        tracing::info!(conn_id = %ack.conn_id, rooms = ?ack.rooms, "Bus connection established");

        let (events_tx, _) = broadcast::channel(1024);
        let pending: Arc<Mutex<HashMap<Uuid, oneshot::Sender<AckPayload>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let closed = CancellationToken::new();

        let client = Self {
            transport: transport.clone(),
            events_tx: events_tx.clone(),
            pending: pending.clone(),
            conn_id: ack.conn_id,
            rooms: ack.rooms,
            closed: closed.clone(),
        };

        // 读循环：事件广播给订阅者，Ack 唤醒挂起的请求
        tokio::spawn(async move {
            loop {
                let msg = match transport.read_message().await {
                    Ok(msg) => msg,
                    Err(TransportError::Disconnected) | Err(TransportError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Bus read error");
                        break;
                    }
                };
                match msg.frame_type {
                    FrameType::Event => match msg.parse_payload::<ServerEvent>() {
                        Ok(event) => {
                            let _ = events_tx.send(event);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping undecodable event frame");
                        }
                    },
                    FrameType::Ack => {
                        let correlation = msg.correlation_id;
                        match (correlation, msg.parse_payload::<AckPayload>()) {
                            (Some(id), Ok(payload)) => {
                                let waiter = pending
                                    .lock()
                                    .expect("pending requests lock poisoned")
                                    .remove(&id);
                                if let Some(tx) = waiter {
                                    let _ = tx.send(payload);
                                }
                            }
                            _ => {
                                tracing::debug!("Ignoring ack without usable correlation");
                            }
                        }
                    }
                    other => {
                        tracing::debug!(frame = %other, "Ignoring unexpected frame");
                    }
                }
            }
            closed.cancel();
        });

        Ok(client)
    }

    /// 服务端分配的连接 ID
    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// 握手时自动加入的房间
    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.events_tx.subscribe(),
        }
    }

    /// 连接关闭信号 (重连编排用)
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// 是否仍然连接
    pub fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// 请求加入房间，等待服务端确认
    pub async fn join_room(&self, room: &Room) -> ClientResult<()> {
        self.room_request(BusMessage::join_room(room)).await
    }

    /// 请求离开房间
    pub async fn leave_room(&self, room: &Room) -> ClientResult<()> {
        self.room_request(BusMessage::leave_room(room)).await
    }

    async fn room_request(&self, msg: BusMessage) -> ClientResult<()> {
        let request_id = msg.request_id;
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending requests lock poisoned")
            .insert(request_id, tx);

        if let Err(e) = self.transport.write_message(&msg).await {
            self.pending
                .lock()
                .expect("pending requests lock poisoned")
                .remove(&request_id);
            return Err(e.into());
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(ack)) if ack.ok => Ok(()),
            Ok(Ok(ack)) => Err(ClientError::Denied(
                ack.message.unwrap_or_else(|| "Request denied".to_string()),
            )),
            Ok(Err(_)) => Err(ClientError::Disconnected),
            Err(_) => {
                self.pending
                    .lock()
                    .expect("pending requests lock poisoned")
                    .remove(&request_id);
                Err(ClientError::Timeout("Room request timed out".to_string()))
            }
        }
    }

    /// 主动断开
    pub async fn close(&self) -> ClientResult<()> {
        self.transport.close().await?;
        self.closed.cancel();
        Ok(())
    }
}

//! Transport 传输层抽象
//!
//! 提供可插拔的传输层架构：
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴────────┐
//!          ▼                ▼
//!     TcpTransport    MemoryTransport
//!     (TCP 协议)      (同进程/测试)
//! ```
//!
//! 帧格式 (与两端实现共享，保证编解码一致)：
//! ```text
//! [frame_type: 1B][request_id: 16B][correlation_id: 16B][len: 4B LE][payload]
//! ```
//! correlation_id 为 nil UUID 时表示 None。

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::message::{BusMessage, FrameType};

/// 单帧载荷上限，超出视为协议违规
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// 传输层错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Peer disconnected")]
    Disconnected,

    #[error("Transport closed")]
    Closed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Transport 传输层特征
///
/// 所有传输实现必须实现此特征，支持消息的读写和连接管理。
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// 从传输层读取一条消息
    async fn read_message(&self) -> TransportResult<BusMessage>;

    /// 向传输层写入一条消息
    async fn write_message(&self, msg: &BusMessage) -> TransportResult<()>;

    /// 关闭传输连接
    async fn close(&self) -> TransportResult<()>;

    /// 获取对端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== 帧编解码 ==========

/// 从异步流中读取一条 BusMessage
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> TransportResult<BusMessage> {
    // 帧类型 (1 字节)；EOF 在帧边界上视为正常断开
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Disconnected);
        }
        Err(e) => return Err(TransportError::Io(format!("Read frame type failed: {e}"))),
    }
    let frame_type = FrameType::try_from(type_buf[0])
        .map_err(|_| TransportError::InvalidFrame(format!("Unknown frame type {}", type_buf[0])))?;

    // Request ID (16 字节)
    let mut uuid_buf = [0u8; 16];
    reader
        .read_exact(&mut uuid_buf)
        .await
        .map_err(|e| TransportError::Io(format!("Read request id failed: {e}")))?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // Correlation ID (16 字节，nil = None)
    let mut correlation_buf = [0u8; 16];
    reader
        .read_exact(&mut correlation_buf)
        .await
        .map_err(|e| TransportError::Io(format!("Read correlation id failed: {e}")))?;
    let correlation_raw = Uuid::from_bytes(correlation_buf);
    let correlation_id = (!correlation_raw.is_nil()).then_some(correlation_raw);

    // 载荷长度 (4 字节 LE)
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TransportError::Io(format!("Read payload length failed: {e}")))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(TransportError::InvalidFrame(format!(
            "Payload length {len} exceeds limit"
        )));
    }

    // 载荷内容
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| TransportError::Io(format!("Read payload failed: {e}")))?;

    Ok(BusMessage {
        request_id,
        frame_type,
        correlation_id,
        payload,
    })
}

/// 向异步流写入一条 BusMessage
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> TransportResult<()> {
    if msg.payload.len() > MAX_PAYLOAD_LEN {
        return Err(TransportError::InvalidFrame(format!(
            "Payload length {} exceeds limit",
            msg.payload.len()
        )));
    }

    let mut frame =
        Vec::with_capacity(1 + 16 + 16 + 4 + msg.payload.len());
    frame.push(msg.frame_type as u8);
    frame.extend_from_slice(msg.request_id.as_bytes());
    frame.extend_from_slice(msg.correlation_id.unwrap_or(Uuid::nil()).as_bytes());
    frame.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&msg.payload);

    writer
        .write_all(&frame)
        .await
        .map_err(|e| TransportError::Io(format!("Write frame failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::Io(format!("Flush failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Room;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let msg = BusMessage::join_room(&Room::Table(7));
        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_from_stream(&mut cursor).await.unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn test_eof_maps_to_disconnected() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        match read_from_stream(&mut cursor).await {
            Err(TransportError::Disconnected) => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_frame_type_rejected() {
        let mut cursor = std::io::Cursor::new(vec![0xFFu8; 64]);
        assert!(matches!(
            read_from_stream(&mut cursor).await,
            Err(TransportError::InvalidFrame(_))
        ));
    }
}

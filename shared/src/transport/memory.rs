//! 内存传输层实现
//!
//! 同进程内的一对端点，测试和嵌入式场景使用。
//! `pair()` 返回两个互相连接的端点，一端写入的消息从另一端读出。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{Transport, TransportError, TransportResult};
use crate::message::BusMessage;

/// 内存传输实现
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    tx: Arc<std::sync::Mutex<Option<mpsc::UnboundedSender<BusMessage>>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<BusMessage>>>,
}

impl MemoryTransport {
    /// 创建一对互相连接的端点
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Arc::new(std::sync::Mutex::new(Some(a_tx))),
                rx: Arc::new(Mutex::new(b_rx)),
            },
            Self {
                tx: Arc::new(std::sync::Mutex::new(Some(b_tx))),
                rx: Arc::new(Mutex::new(a_rx)),
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> TransportResult<BusMessage> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(TransportError::Disconnected)
    }

    async fn write_message(&self, msg: &BusMessage) -> TransportResult<()> {
        let tx = self.tx.lock().expect("memory transport lock poisoned");
        match tx.as_ref() {
            Some(tx) => tx
                .send(msg.clone())
                .map_err(|_| TransportError::Disconnected),
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&self) -> TransportResult<()> {
        // 丢弃发送端，对端的 read 将返回 Disconnected
        self.tx.lock().expect("memory transport lock poisoned").take();
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        Some("memory".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Room;

    #[tokio::test]
    async fn test_pair_is_cross_wired() {
        let (a, b) = MemoryTransport::pair();
        let msg = BusMessage::join_room(&Room::Staff);
        a.write_message(&msg).await.unwrap();
        assert_eq!(b.read_message().await.unwrap(), msg);
    }

    #[tokio::test]
    async fn test_close_disconnects_peer() {
        let (a, b) = MemoryTransport::pair();
        a.close().await.unwrap();
        assert!(matches!(
            b.read_message().await,
            Err(TransportError::Disconnected)
        ));
        assert!(matches!(
            a.write_message(&BusMessage::join_room(&Room::Staff)).await,
            Err(TransportError::Closed)
        ));
    }
}

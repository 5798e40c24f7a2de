//! 实时通道的 TCP 接入点

use std::net::SocketAddr;
use std::sync::Arc;

use shared::transport::TcpTransport;
use tokio::net::TcpListener;

use crate::realtime::bus::EventBus;
use crate::realtime::connection::{serve_connection, HandshakeAuth};
use crate::utils::error::{AppError, AppResult};

/// 启动 TCP 接入循环，返回实际绑定地址 (端口 0 时由系统分配)
pub async fn start_tcp_server(
    bus: Arc<EventBus>,
    auth: HandshakeAuth,
    addr: SocketAddr,
) -> AppResult<SocketAddr> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind bus listener on {addr}: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read bus listener address: {e}")))?;
    tracing::info!(addr = %local_addr, "Event bus listening");

    let shutdown = bus.shutdown_token().clone();
    tokio::spawn(async move {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer = %peer, "Bus connection accepted");
                    let transport = Arc::new(TcpTransport::from_stream(stream));
                    tokio::spawn(serve_connection(bus.clone(), auth.clone(), transport));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Bus accept failed");
                }
            }
        }
        tracing::info!("Event bus listener stopped");
    });

    Ok(local_addr)
}

//! Server Implementation
//!
//! HTTP 服务器与实时总线的启动和关闭编排。

use std::net::SocketAddr;

use crate::core::tasks::{BackgroundTasks, TaskKind, end_of_day_sweep_loop};
use crate::core::{Config, ServerState};
use crate::realtime::start_tcp_server;
use crate::utils::error::{AppError, AppResult};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// 使用已初始化的状态创建 (测试或外部编排用)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> AppResult<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        // 实时总线 TCP 入口
        let bus_addr = SocketAddr::from(([0, 0, 0, 0], self.config.bus_tcp_port));
        let bus_local =
            start_tcp_server(state.bus.clone(), state.handshake_auth(), bus_addr).await?;

        // 后台任务
        let mut tasks = BackgroundTasks::new();
        tasks.spawn(
            "end_of_day_sweep",
            TaskKind::Periodic,
            end_of_day_sweep_loop(
                state.sessions.clone(),
                self.config.cutoff(),
                tasks.shutdown_token(),
            ),
        );

        let app = crate::api::create_router(state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind HTTP listener: {e}")))?;

        tracing::info!("🍽️ FOH server starting on {}", addr);
        tracing::info!("Event bus available on tcp://{}", bus_local);

        let shutdown_bus = state.bus.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
                shutdown_bus.shutdown();
            })
            .await
            .map_err(|e| AppError::internal(format!("HTTP server failed: {e}")))?;

        tasks.shutdown().await;
        Ok(())
    }
}

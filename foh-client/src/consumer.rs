//! 状态消费者
//!
//! 把实时通道和 REST 通道编排成一份本地状态：
//!
//! - 每次 断开→连接 转换后做一次全量拉取；
//! - 刷新定时器无论连接状态如何都触发同一条全量拉取路径；
//! - 重连按固定次数、固定退避尝试，用尽后进入 Offline
//!   (刷新定时器继续跑，所以 Offline 不等于状态冻结)。

use std::sync::{Arc, Mutex};

use shared::event::ServerEvent;
use shared::models::Employee;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{BusClient, ClientConfig, ClientError, ClientResult, HttpClient, Reconciler};

/// 连接状态 (观察者通过 watch 通道获知)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
    /// 重连次数用尽；只剩周期性拉取在维持状态
    Offline,
}

/// State consumer
pub struct StateConsumer {
    config: ClientConfig,
    http: HttpClient,
    state: Arc<Mutex<Reconciler>>,
    user: Arc<Mutex<Option<Employee>>>,
    conn_tx: watch::Sender<ConnectionState>,
    conn_rx: watch::Receiver<ConnectionState>,
}

impl StateConsumer {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = HttpClient::new(&config)?;
        let (conn_tx, conn_rx) = watch::channel(ConnectionState::Reconnecting);
        Ok(Self {
            config,
            http,
            state: Arc::new(Mutex::new(Reconciler::new())),
            user: Arc::new(Mutex::new(None)),
            conn_tx,
            conn_rx,
        })
    }

    /// 当前连接状态的观察端
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.conn_rx.clone()
    }

    /// 本地状态快照句柄
    pub fn state(&self) -> Arc<Mutex<Reconciler>> {
        self.state.clone()
    }

    /// 最近一次回查到的权威用户记录
    pub fn current_user(&self) -> Option<Employee> {
        self.user.lock().expect("user lock poisoned").clone()
    }

    /// 全量拉取，替换本地快照
    ///
    /// 重连路径和定时刷新路径都汇到这里。
    pub async fn refresh(&self) -> ClientResult<()> {
        if let Some(table) = self.config.watch_table {
            let orders = self.http.orders_by_table(table).await?;
            self.state
                .lock()
                .expect("state lock poisoned")
                .replace_orders(orders);
        }

        // 会话列表只对员工凭证可见
        if self.config.bearer_token().is_some() {
            let sessions = self.http.sessions_today().await?;
            self.state
                .lock()
                .expect("state lock poisoned")
                .replace_sessions(sessions);
        }
        Ok(())
    }

    /// 运行消费循环直到取消
    pub async fn run(&self, shutdown: CancellationToken) {
        let refresh_loop = self.refresh_loop(shutdown.clone());
        let connection_loop = self.connection_loop(shutdown.clone());
        tokio::join!(refresh_loop, connection_loop);
    }

    /// 定时刷新：连接状态无关，30s (可配) 一次
    async fn refresh_loop(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "Periodic refresh failed");
            }
        }
    }

    /// 连接循环：有界重试，用尽进入 Offline
    async fn connection_loop(&self, shutdown: CancellationToken) {
        'reconnect: loop {
            let mut client = None;
            for attempt in 1..=self.config.max_attempts {
                if shutdown.is_cancelled() {
                    break 'reconnect;
                }
                match BusClient::connect(
                    &self.config.bus_addr,
                    self.config.credential.clone(),
                    &self.config.client_name,
                )
                .await
                {
                    Ok(c) => {
                        client = Some(c);
                        break;
                    }
                    Err(ClientError::Refused(reason)) => {
                        // 凭证被拒不是瞬态故障，重试没有意义
                        tracing::error!(reason = %reason, "Handshake refused, going offline");
                        let _ = self.conn_tx.send(ConnectionState::Offline);
                        break 'reconnect;
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt,
                            max = self.config.max_attempts,
                            error = %e,
                            "Bus connect failed"
                        );
                        tokio::select! {
                            _ = shutdown.cancelled() => break 'reconnect,
                            _ = tokio::time::sleep(self.config.retry_backoff) => {}
                        }
                    }
                }
            }

            let Some(client) = client else {
                tracing::error!("Reconnect attempts exhausted, going offline");
                let _ = self.conn_tx.send(ConnectionState::Offline);
                break;
            };

            let _ = self.conn_tx.send(ConnectionState::Connected);

            // 断开→连接 转换后的全量自愈
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "Post-connect refresh failed");
            }

            self.consume_events(&client, &shutdown).await;
            if shutdown.is_cancelled() {
                let _ = client.close().await;
                break;
            }
            let _ = self.conn_tx.send(ConnectionState::Reconnecting);
        }
    }

    /// 消费事件直到连接断开
    async fn consume_events(&self, client: &BusClient, shutdown: &CancellationToken) {
        let mut subscription = client.subscribe();
        let closed = client.closed();
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = closed.cancelled() => break,
                event = subscription.recv() => match event {
                    Ok(ev) => ev,
                    Err(_) => break,
                },
            };
            self.handle_event(event).await;
        }
    }

    async fn handle_event(&self, event: ServerEvent) {
        match &event {
            // 审批事件只是信号：权威记录走 REST 回查
            ServerEvent::AccountApproved { .. } | ServerEvent::RoleChanged { .. } => {
                match self.http.me().await {
                    Ok(user) => {
                        tracing::info!(user_id = %user.id, approved = user.is_approved, "User record refreshed");
                        *self.user.lock().expect("user lock poisoned") = Some(user);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to refresh user record");
                    }
                }
            }
            ServerEvent::AccountRejected { reason, .. } => {
                tracing::warn!(reason = %reason, "Account rejected");
                *self.user.lock().expect("user lock poisoned") = None;
            }
            ServerEvent::AccountDeleted { .. } => {
                tracing::warn!("Account deleted");
                *self.user.lock().expect("user lock poisoned") = None;
            }
            _ => {
                self.state
                    .lock()
                    .expect("state lock poisoned")
                    .apply(&event);
            }
        }
    }
}

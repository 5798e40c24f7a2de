//! Client configuration

use std::time::Duration;

use shared::message::Credential;

/// 重连尝试上限 (默认)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// 重连退避 (固定间隔，默认)
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// 周期性全量拉取间隔 (默认)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Client configuration for connecting to the FOH server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Realtime bus TCP address (e.g., "localhost:8081")
    pub bus_addr: String,

    /// 握手凭证 — 员工 JWT 或客人会话令牌
    pub credential: Credential,

    /// 客户端名称 (握手时上报，日志用)
    pub client_name: String,

    /// HTTP request timeout in seconds
    pub timeout: u64,

    /// 重连尝试上限；用尽后进入 Offline
    pub max_attempts: u32,

    /// 重连退避 (固定间隔)
    pub retry_backoff: Duration,

    /// 周期性全量拉取间隔
    pub refresh_interval: Duration,

    /// 关注的桌台 (订单全量拉取的范围)
    pub watch_table: Option<u32>,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        bus_addr: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            bus_addr: bus_addr.into(),
            credential,
            client_name: "foh-client".to_string(),
            timeout: 30,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            watch_table: None,
        }
    }

    /// 员工端配置 (REST 同款 JWT)
    pub fn staff(
        base_url: impl Into<String>,
        bus_addr: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self::new(
            base_url,
            bus_addr,
            Credential::Staff {
                token: token.into(),
            },
        )
    }

    /// 客人端配置 (会话令牌)
    pub fn customer(
        base_url: impl Into<String>,
        bus_addr: impl Into<String>,
        session_token: impl Into<String>,
        table_number: u32,
    ) -> Self {
        let mut config = Self::new(
            base_url,
            bus_addr,
            Credential::Customer {
                session_token: session_token.into(),
            },
        );
        config.watch_table = Some(table_number);
        config
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_watch_table(mut self, table_number: u32) -> Self {
        self.watch_table = Some(table_number);
        self
    }

    /// 员工凭证里的 bearer token (HTTP 客户端复用)
    pub fn bearer_token(&self) -> Option<&str> {
        match &self.credential {
            Credential::Staff { token } => Some(token),
            Credential::Customer { .. } => None,
        }
    }
}

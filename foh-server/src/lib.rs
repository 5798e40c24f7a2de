//! FOH Server - 餐厅前厅会话与实时通知服务
//!
//! # 架构概述
//!
//! 本模块是前厅服务端的主入口，提供以下核心功能：
//!
//! - **会话生命周期** (`session`): 桌台二维码会话的签发、校验、过期
//! - **实时事件总线** (`realtime`): 带房间与鉴权的持久连接推送
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储与仓储层
//! - **认证** (`auth`): JWT + Argon2 认证体系与角色门禁
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! foh-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # JWT 认证、角色与审批门禁
//! ├── session/       # 会话生命周期服务
//! ├── realtime/      # 事件总线、房间、TCP 服务
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (模型 + 仓储)
//! └── utils/         # 错误、日志、时间、令牌
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod realtime;
pub mod session;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use realtime::EventBus;
pub use session::SessionService;
pub use utils::{AppError, AppResult};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    utils::logger::init_logger();
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ______ ____  __  __
   / ____// __ \/ / / /
  / /_   / / / / /_/ /
 / __/  / /_/ / __  /
/_/     \____/_/ /_/   server
    "#
    );
}

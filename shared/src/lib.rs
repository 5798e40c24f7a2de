//! Shared types for the front-of-house stack
//!
//! 服务端 (foh-server) 和客户端 (foh-client) 共用的线上类型：
//!
//! - **数据模型** (`models`): 桌台会话、订单、员工账号
//! - **事件目录** (`event`): 封闭的服务端事件联合类型
//! - **消息封装** (`message`): 消息总线信封、握手与房间协议
//! - **传输层** (`transport`): TCP / 内存传输实现与帧编解码
//! - **响应信封** (`response`): REST API 统一 `{success, ...}` 结构

pub mod event;
pub mod message;
pub mod models;
pub mod response;
pub mod transport;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use event::ServerEvent;
pub use message::{BusMessage, FrameType, Room};
pub use models::{Order, OrderStatus, Role, TableSession};
pub use response::ApiResponse;

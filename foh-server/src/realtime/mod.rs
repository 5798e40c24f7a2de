//! 实时事件总线
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       EventBus                           │
//! │  connections: DashMap<ConnId, ConnectionHandle>          │
//! │  rooms:       DashMap<Room, HashSet<ConnId>>             │
//! └────────────────────────┬─────────────────────────────────┘
//!                          │ mpsc (每连接独立 FIFO 队列)
//!               ┌──────────┴──────────┐
//!               ▼                     ▼
//!        serve_connection      serve_connection
//!         (TcpTransport)       (MemoryTransport)
//! ```
//!
//! # 消息流
//!
//! ```text
//! Handler ──▶ emit_to_room()/emit_to_user() ──▶ 每连接队列 ──▶ writer 任务
//! Client  ──▶ JoinRoom/LeaveRoom ──▶ 授权检查 ──▶ Ack
//! ```
//!
//! 投递保证：单连接内按发射顺序 FIFO；跨连接无全序。
//! at-most-once，无重放 —— 慢消费者队列溢出直接断开，由客户端
//! 重连后的全量拉取自愈。

pub mod bus;
pub mod connection;
pub mod tcp_server;

pub use bus::{BusError, ConnId, EventBus, Principal};
pub use connection::{HandshakeAuth, serve_connection};
pub use tcp_server::start_tcp_server;

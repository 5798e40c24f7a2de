//! FOH Client - 前厅服务端的消费端
//!
//! 两条通道，一个状态：
//!
//! - **实时通道** ([`BusClient`]): 持久连接，握手后按房间接收
//!   [`shared::event::ServerEvent`] 推送。
//! - **REST 通道** ([`HttpClient`]): 周期性全量拉取与重连后自愈。
//!
//! 两条通道都汇入 [`Reconciler`] —— 事件做幂等增量合并，
//! 全量拉取直接替换快照。即使推送全部丢失，本地状态的
//! 陈旧度也被刷新间隔封顶。

pub mod bus;
pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod reconcile;

pub use bus::{BusClient, Subscription};
pub use config::ClientConfig;
pub use consumer::{ConnectionState, StateConsumer};
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use reconcile::Reconciler;

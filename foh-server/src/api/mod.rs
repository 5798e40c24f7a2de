//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 登录与注册
//! - [`table_session`] - 桌台会话生命周期
//! - [`orders`] - 订单 (客人下单 + 员工操作)
//! - [`accounts`] - 账号审批与角色管理

pub mod accounts;
pub mod auth;
pub mod health;
pub mod orders;
pub mod table_session;

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::core::ServerState;

/// 组装完整路由
///
/// `require_auth` 挂在最外层：公开路由在中间件内部白名单放行，
/// 其余 `/api/*` 要求 bearer JWT。
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(table_session::router())
        .merge(orders::router())
        .merge(accounts::router())
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

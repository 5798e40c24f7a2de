//! Account API 模块

mod handler;

use axum::{Router, middleware, routing::{delete, get, post, put}};

use crate::auth::{require_admin, require_approved};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    // /me 对所有已登录员工开放 (未审批账号靠它轮询审批状态)
    let me = Router::new().route("/api/accounts/me", get(handler::me));

    // 审批门禁在角色门禁之前：未审批的 admin 账号也进不来
    let admin = Router::new()
        .route("/api/accounts/{id}/approve", post(handler::approve))
        .route("/api/accounts/{id}/reject", post(handler::reject))
        .route("/api/accounts/{id}/role", put(handler::change_role))
        .route("/api/accounts/{id}", delete(handler::remove))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(require_approved));

    me.merge(admin)
}

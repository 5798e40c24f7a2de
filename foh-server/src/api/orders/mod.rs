//! Order API 模块

mod handler;

use axum::{Router, middleware, routing::{delete, get, post, put}};

use crate::auth::require_approved;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    // 客人路径：下单与查看本桌订单 (凭会话令牌)
    let public = Router::new()
        .route("/api/order/place", post(handler::place))
        .route("/api/order/table/{table_number}", get(handler::by_table));

    let staff = Router::new()
        .route("/api/order/{id}/status", put(handler::update_status))
        .route("/api/order/{id}", delete(handler::remove))
        .layer(middleware::from_fn(require_approved));

    public.merge(staff)
}

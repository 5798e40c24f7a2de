//! Table Session API 模块

mod handler;

use axum::{Router, middleware, routing::{get, post}};

use crate::auth::require_approved;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    // 客人扫码校验是唯一的公开路由
    let public = Router::new().route(
        "/api/table-session/validate/{token}",
        get(handler::validate),
    );

    let staff = Router::new()
        .route("/api/table-session/generate", post(handler::generate))
        .route("/api/table-session/active", get(handler::active))
        .route("/api/table-session/stats", get(handler::stats))
        .route("/api/table-session/{id}/expire", post(handler::expire))
        .layer(middleware::from_fn(require_approved));

    public.merge(staff)
}

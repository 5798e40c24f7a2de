//! Health Check Handler

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use shared::ApiResponse;

use crate::core::ServerState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub connections: usize,
}

pub async fn health(State(state): State<ServerState>) -> Json<ApiResponse<HealthBody>> {
    Json(ApiResponse::ok(HealthBody {
        status: "ok",
        connections: state.bus.connection_count(),
    }))
}

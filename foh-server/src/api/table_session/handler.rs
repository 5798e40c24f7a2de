//! Table Session Handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use serde::Deserialize;
use shared::models::{InvalidReason, SessionValidation};
use shared::response::{ApiResponse, SessionBody, SessionListBody, StatsBody, ValidateBody};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub table_number: u32,
}

/// 为桌台生成会话二维码
///
/// 桌台已有活跃会话时返回 409，绝不静默替换。
pub async fn generate(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GenerateRequest>,
) -> AppResult<Json<ApiResponse<SessionBody>>> {
    let session = state.sessions.generate(req.table_number, &user.id).await?;
    let customer_url = session.customer_url(&state.config.customer_app_base);
    Ok(Json(ApiResponse::ok(SessionBody {
        session,
        customer_url,
    })))
}

/// 客人扫码校验 (公开，纯读)
pub async fn validate(
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> AppResult<Json<ApiResponse<ValidateBody>>> {
    match state.sessions.validate(&token).await? {
        SessionValidation::Valid { table_number } => {
            Ok(Json(ApiResponse::ok(ValidateBody { table_number })))
        }
        SessionValidation::Invalid { reason } => Err(match reason {
            InvalidReason::NotFound => AppError::not_found("Unknown session token"),
            InvalidReason::Expired => AppError::validation("Session has expired"),
        }),
    }
}

/// 当前营业日的会话列表 (含已过期)，新的在前
pub async fn active(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<SessionListBody>>> {
    let sessions = state.sessions.list_today().await?;
    let count = sessions.len();
    Ok(Json(ApiResponse::ok(SessionListBody { sessions, count })))
}

/// 当前营业日统计
pub async fn stats(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<StatsBody>>> {
    let (stats, date) = state.sessions.stats_today().await?;
    Ok(Json(ApiResponse::ok(StatsBody {
        stats,
        date: date.format("%Y-%m-%d").to_string(),
    })))
}

/// 手动过期会话 (幂等)
pub async fn expire(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SessionBody>>> {
    let session = state.sessions.expire(&id, &user.id).await?;
    let customer_url = session.customer_url(&state.config.customer_app_base);
    Ok(Json(ApiResponse::ok(SessionBody {
        session,
        customer_url,
    })))
}

//! Account Handlers
//!
//! 审批、拒绝、删号、改角色。每个变更都向目标用户的定向房间
//! 发对应事件；事件是刷新信号，权威状态永远以 REST 读取为准。

use axum::Json;
use axum::extract::{Extension, Path, State};
use serde::Deserialize;
use shared::event::ServerEvent;
use shared::models::Role;
use shared::response::{ApiResponse, UserBody};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::error::{AppError, AppResult, ok_message};

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// 当前登录用户的权威记录
pub async fn me(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    let record = state
        .employees
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Account no longer exists"))?;
    Ok(Json(ApiResponse::ok(UserBody {
        user: record.into_shared(),
    })))
}

/// 审批账号
pub async fn approve(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    let record = state.employees.set_approved(&id, true).await?;
    let user = record.into_shared();

    security_log!(
        "INFO",
        "account_approved",
        user_id = user.id.clone(),
        by = admin.id.clone()
    );
    state.bus.emit_to_user(
        &user.id,
        &ServerEvent::AccountApproved {
            message: "Your account has been approved".to_string(),
        },
    );
    Ok(Json(ApiResponse::ok_with_message(
        UserBody { user },
        "Account approved",
    )))
}

/// 拒绝注册申请
///
/// 发出定向事件后删除记录；被拒的账号不保留。
pub async fn reject(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let record = state
        .employees
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Employee {} not found", id)))?;
    let reason = req
        .reason
        .unwrap_or_else(|| "Registration was not approved".to_string());

    state.bus.emit_to_user(
        &record.id.to_string(),
        &ServerEvent::AccountRejected {
            message: "Your registration has been rejected".to_string(),
            reason: reason.clone(),
        },
    );
    state.employees.delete(&id).await?;

    security_log!(
        "INFO",
        "account_rejected",
        user_id = id.clone(),
        by = admin.id.clone(),
        reason = reason
    );
    Ok(ok_message("Registration rejected"))
}

/// 变更角色
pub async fn change_role(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    let record = state.employees.set_role(&id, req.role).await?;
    let user = record.into_shared();

    security_log!(
        "INFO",
        "role_changed",
        user_id = user.id.clone(),
        by = admin.id.clone(),
        new_role = user.role.to_string()
    );
    state.bus.emit_to_user(
        &user.id,
        &ServerEvent::RoleChanged {
            message: format!("Your role is now {}", user.role),
            new_role: user.role,
        },
    );
    Ok(Json(ApiResponse::ok_with_message(
        UserBody { user },
        "Role updated",
    )))
}

/// 删除账号
pub async fn remove(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    if admin.id == id {
        return Err(AppError::validation("Cannot delete your own account"));
    }

    state.bus.emit_to_user(
        &id,
        &ServerEvent::AccountDeleted {
            message: "Your account has been removed".to_string(),
        },
    );
    let deleted = state.employees.delete(&id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Employee {} not found", id)));
    }

    security_log!(
        "INFO",
        "account_deleted",
        user_id = id.clone(),
        by = admin.id.clone()
    );
    Ok(ok_message("Account deleted"))
}

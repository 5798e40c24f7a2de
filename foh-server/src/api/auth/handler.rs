//! Authentication Handlers

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use shared::models::Role;
use shared::response::{ApiResponse, LoginBody, UserBody};
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::core::ServerState;
use crate::db::models::EmployeeCreate;
use crate::security_log;
use crate::utils::error::{AppError, AppResult};

/// 认证路径的固定延迟，防止时序攻击
const AUTH_FIXED_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// 申请的角色，默认 waiter；审批前不生效
    pub role: Option<Role>,
}

/// Login handler
///
/// 未审批账号也可以登录 (令牌带 `is_approved: false`)，
/// 中间件会把它们挡在角色区域之外。
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginBody>>> {
    req.validate()
        .map_err(|_| AppError::invalid_credentials())?;

    let employee = state.employees.find_by_username(&req.username).await?;

    // 固定延迟放在结果检查之前
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let employee = match employee {
        Some(e) if verify_password(&req.password, &e.password_hash)? => e,
        _ => {
            security_log!("WARN", "login_failed", username = req.username.clone());
            return Err(AppError::invalid_credentials());
        }
    };

    let user = employee.into_shared();
    let token = state
        .jwt_service
        .generate_token(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
    Ok(Json(ApiResponse::ok(LoginBody { token, user })))
}

/// Register handler
///
/// 创建未审批账号；审批前只能登录和等待。
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    // 管理员账号只能由管理员指派，不开放自助注册
    if req.role == Some(Role::Admin) {
        security_log!("WARN", "admin_register_attempt", username = req.username.clone());
        return Err(AppError::validation(
            "Administrator accounts cannot be self-registered",
        ));
    }

    let created = state
        .employees
        .create(EmployeeCreate {
            username: req.username,
            password_hash: hash_password(&req.password)?,
            role: req.role.unwrap_or(Role::Waiter),
            is_approved: false,
            created_at: Utc::now().timestamp_millis(),
        })
        .await?;

    let user = created.into_shared();
    tracing::info!(user_id = %user.id, username = %user.username, "Account registered, pending approval");
    Ok(Json(ApiResponse::ok_with_message(
        UserBody { user },
        "Registration submitted, awaiting approval",
    )))
}

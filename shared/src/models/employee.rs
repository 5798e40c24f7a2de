//! 员工账号模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 员工角色 — 决定登录后的落地区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Waiter,
    Kitchen,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Manager => write!(f, "manager"),
            Self::Waiter => write!(f, "waiter"),
            Self::Kitchen => write!(f, "kitchen"),
        }
    }
}

/// 员工账号 (不含密码散列，密码只存在于服务端存储模型)
///
/// 未审批的账号无论角色如何都停留在等待区，
/// 直到管理员将 `isAproved` 置位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub username: String,
    pub role: Role,
    /// 字段名沿用旧版 API 的拼写，改动会破坏已部署的客户端
    #[serde(rename = "isAproved")]
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

//! Employee 存储模型

use serde::{Deserialize, Serialize};
use shared::models::{Employee, Role};
use surrealdb::RecordId;

use super::millis_to_datetime;

/// 存储中的员工记录 (密码散列只存在于此，不进线上模型)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: RecordId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_approved: bool,
    pub created_at: i64,
}

impl EmployeeRecord {
    /// 转换为线上模型 (剥离密码散列)
    pub fn into_shared(self) -> Employee {
        Employee {
            id: self.id.to_string(),
            username: self.username,
            role: self.role,
            is_approved: self.is_approved,
            created_at: millis_to_datetime(self.created_at),
        }
    }
}

/// CREATE 内容 (id 由存储分配)
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeCreate {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_approved: bool,
    pub created_at: i64,
}

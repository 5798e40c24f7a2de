//! Table Session 存储模型

use serde::{Deserialize, Serialize};
use shared::models::TableSession;
use surrealdb::RecordId;

use super::millis_to_datetime;

/// 存储中的会话记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSessionRecord {
    pub id: RecordId,
    pub table_number: u32,
    pub session_token: String,
    pub is_active: bool,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub created_by: String,
}

impl TableSessionRecord {
    /// 转换为线上模型
    pub fn into_shared(self) -> TableSession {
        TableSession {
            id: self.id.to_string(),
            table_number: self.table_number,
            session_token: self.session_token,
            is_active: self.is_active,
            created_at: millis_to_datetime(self.created_at),
            expires_at: self.expires_at.map(millis_to_datetime),
            created_by: self.created_by,
        }
    }
}

/// CREATE 内容 (id 由存储分配)
#[derive(Debug, Clone, Serialize)]
pub struct TableSessionCreate {
    pub table_number: u32,
    pub session_token: String,
    pub is_active: bool,
    pub created_at: i64,
    pub created_by: String,
}

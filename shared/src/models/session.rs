//! 桌台会话模型
//!
//! 一张桌台同一时刻最多存在一个活跃会话，该不变量由
//! 存储层的原子条件写入保证，模型本身不做任何检查。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 桌台会话 — 绑定实体桌台与点餐通道的时限性一次性凭证
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSession {
    /// 服务端分配的不可变 ID ("table_session:xyz")
    pub id: String,
    /// 桌号 (正整数，仅在"当前活跃"范围内唯一)
    pub table_number: u32,
    /// 不可猜测的随机令牌，客人侧唯一凭证
    pub session_token: String,
    /// 活跃标志；创建时为 true，过期后永远为 false
    pub is_active: bool,
    /// 创建时间 (不可变)
    pub created_at: DateTime<Utc>,
    /// 过期时间；仅在会话被关闭后存在
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// 生成该会话的员工 ID (审计用)
    pub created_by: String,
}

impl TableSession {
    /// 客人扫码后落地的 URL: `<base>/s/<token>/<table>`
    ///
    /// 令牌是唯一权威凭证，桌号仅用于展示兜底。
    pub fn customer_url(&self, base: &str) -> String {
        format!(
            "{}/s/{}/{}",
            base.trim_end_matches('/'),
            self.session_token,
            self.table_number
        )
    }
}

/// 会话校验结果 — 只读查询的返回值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionValidation {
    Valid { table_number: u32 },
    Invalid { reason: InvalidReason },
}

/// 校验失败原因；存储层细节不向外泄漏，只区分这两种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotFound,
    Expired,
}

impl SessionValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionValidation::Valid { .. })
    }
}

/// 当日会话统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub active_count: usize,
    pub expired_count: usize,
    pub total_count: usize,
}

impl SessionStats {
    /// 对内存中的会话列表做纯计算，结果必须与 `is_active` 一致
    pub fn from_sessions(sessions: &[TableSession]) -> Self {
        let active_count = sessions.iter().filter(|s| s.is_active).count();
        Self {
            active_count,
            expired_count: sessions.len() - active_count,
            total_count: sessions.len(),
        }
    }
}

//! 服务端事件目录
//!
//! 封闭的事件联合类型：每个事件有固定的载荷结构，在传输边界
//! 解码一次，消费端不再做临时的动态解析。
//!
//! 投递语义为 at-most-once / fire-and-forget —— 没有重放日志。
//! 每个事件都存在对应的幂等 REST 读取可以重新推导当前状态，
//! 断线客户端靠重连后的全量拉取自愈。

use serde::{Deserialize, Serialize};

use crate::models::{Order, OrderStatusPatch, Role, TableSession};

/// 服务端推送事件
///
/// | 事件 | 接收方 |
/// |------|--------|
/// | `newOrder` / `orderStatusUpdated` / `orderDeleted` | staff 房间 + 对应桌台房间 |
/// | `sessionCreated` | staff 房间 |
/// | `sessionExpired` | staff 房间 + 对应桌台房间 |
/// | `account:*` / `role:changed` | 目标用户专属房间 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "newOrder")]
    NewOrder(Order),

    #[serde(rename = "orderStatusUpdated")]
    OrderStatusUpdated(OrderStatusPatch),

    #[serde(rename = "orderDeleted")]
    OrderDeleted { id: String },

    #[serde(rename = "sessionCreated")]
    SessionCreated(TableSession),

    #[serde(rename = "sessionExpired")]
    SessionExpired {
        id: String,
        #[serde(rename = "tableNumber")]
        table_number: u32,
    },

    #[serde(rename = "account:approved")]
    AccountApproved { message: String },

    #[serde(rename = "account:rejected")]
    AccountRejected { message: String, reason: String },

    #[serde(rename = "account:deleted")]
    AccountDeleted { message: String },

    #[serde(rename = "role:changed")]
    RoleChanged {
        message: String,
        #[serde(rename = "newRole")]
        new_role: Role,
    },
}

impl ServerEvent {
    /// 事件的线上名称 (日志与调试用)
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewOrder(_) => "newOrder",
            Self::OrderStatusUpdated(_) => "orderStatusUpdated",
            Self::OrderDeleted { .. } => "orderDeleted",
            Self::SessionCreated(_) => "sessionCreated",
            Self::SessionExpired { .. } => "sessionExpired",
            Self::AccountApproved { .. } => "account:approved",
            Self::AccountRejected { .. } => "account:rejected",
            Self::AccountDeleted { .. } => "account:deleted",
            Self::RoleChanged { .. } => "role:changed",
        }
    }

    /// 是否是只发给单个用户的定向事件
    pub fn is_directed(&self) -> bool {
        matches!(
            self,
            Self::AccountApproved { .. }
                | Self::AccountRejected { .. }
                | Self::AccountDeleted { .. }
                | Self::RoleChanged { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::Utc;

    #[test]
    fn test_event_wire_tag() {
        let ev = ServerEvent::OrderDeleted {
            id: "order:42".to_string(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "orderDeleted");
        assert_eq!(json["data"]["id"], "order:42");
    }

    #[test]
    fn test_account_event_names_keep_colon() {
        let ev = ServerEvent::AccountRejected {
            message: "rejected".to_string(),
            reason: "incomplete profile".to_string(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "account:rejected");
    }

    #[test]
    fn test_round_trip_through_wire_shape() {
        let ev = ServerEvent::OrderStatusUpdated(OrderStatusPatch {
            id: "order:7".to_string(),
            status: OrderStatus::Preparing,
            updated_at: Utc::now(),
        });
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.name(), "orderStatusUpdated");
        assert!(!back.is_directed());
    }
}

//! REST API 统一响应信封
//!
//! 所有端点都返回 `{"success": bool, ...}`；失败路径永远是
//! `{"success": false, "message": "..."}`，UI 层不需要处理异常穿透。

use serde::{Deserialize, Serialize};

use crate::models::{Employee, Order, SessionStats, TableSession};

/// 泛型响应信封 — 数据字段被拍平进顶层对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// 只带消息的成功响应 (删除类操作用)
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

// ==================== Typed response bodies ====================
//
// 客户端的周期性全量拉取按这些结构反序列化。

/// `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginBody {
    pub token: String,
    pub user: Employee,
}

/// `POST /api/table-session/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub session: TableSession,
    pub customer_url: String,
}

/// `GET /api/table-session/validate/:token` (成功分支)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBody {
    pub table_number: u32,
}

/// `GET /api/table-session/active`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListBody {
    pub sessions: Vec<TableSession>,
    pub count: usize,
}

/// `GET /api/table-session/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsBody {
    pub stats: SessionStats,
    /// 营业日 (YYYY-MM-DD)
    pub date: String,
}

/// `POST /api/order/place` / `PUT /api/order/:id/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBody {
    pub order: Order,
}

/// `GET /api/order/table/:tableNumber`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListBody {
    pub orders: Vec<Order>,
}

/// `GET /api/accounts/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
    pub user: Employee,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_shape() {
        let resp: ApiResponse<ValidateBody> = ApiResponse::fail("expired");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "expired");
        assert!(json.get("tableNumber").is_none());
    }

    #[test]
    fn test_ok_flattens_body() {
        let resp = ApiResponse::ok(ValidateBody { table_number: 7 });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["tableNumber"], 7);
    }
}

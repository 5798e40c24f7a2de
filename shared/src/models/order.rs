//! 订单模型
//!
//! 订单按桌号路由而非会话 ID —— 同一桌台历史上的多个会话
//! 共享同一个桌号身份。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态流转: pending → preparing → served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Served,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Preparing => write!(f, "preparing"),
            Self::Served => write!(f, "served"),
        }
    }
}

/// 订单行项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// 订单 (本子系统消费、不拥有)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub table_number: u32,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// 服务端根据 items 计算，客户端提交值不被信任
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 订单状态变更的部分载荷 — 只携带发生变化的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusPatch {
    pub id: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Preparing).unwrap(),
            "\"preparing\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"served\"").unwrap();
        assert_eq!(parsed, OrderStatus::Served);
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            name: "Ramen".to_string(),
            quantity: 3,
            price: 12.5,
        };
        assert!((item.line_total() - 37.5).abs() < f64::EPSILON);
    }
}

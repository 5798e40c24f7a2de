//! Order 存储模型

use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderItem, OrderStatus};
use surrealdb::RecordId;

use super::millis_to_datetime;

/// 存储中的订单记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: RecordId,
    pub table_number: u32,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrderRecord {
    /// 转换为线上模型
    pub fn into_shared(self) -> Order {
        Order {
            id: self.id.to_string(),
            table_number: self.table_number,
            items: self.items,
            status: self.status,
            total_amount: self.total_amount,
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        }
    }
}

/// CREATE 内容 (id 由存储分配)
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreate {
    pub table_number: u32,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

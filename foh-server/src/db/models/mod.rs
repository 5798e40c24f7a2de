//! 存储层模型
//!
//! 与线上模型 (`shared::models`) 的区别：
//! - id 是 `surrealdb::RecordId` 而非字符串
//! - 时间戳是 `i64` Unix millis，转换统一在 `into_shared` 完成

mod employee;
mod order;
mod table_session;

pub use employee::{EmployeeCreate, EmployeeRecord};
pub use order::{OrderCreate, OrderRecord};
pub use table_session::{TableSessionCreate, TableSessionRecord};

use chrono::{DateTime, Utc};

/// Unix millis → DateTime<Utc>；越界时钳到 epoch (存储层不应出现)
pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

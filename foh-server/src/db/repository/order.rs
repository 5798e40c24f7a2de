//! Order Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{OrderCreate, OrderRecord};
use shared::models::OrderStatus;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 创建订单
    pub async fn create(&self, data: OrderCreate) -> RepoResult<OrderRecord> {
        let created: Option<OrderRecord> = self.base.db().create(TABLE).content(data).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// 按 id 查找
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<OrderRecord>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid order ID: {}", id)))?;
        let order: Option<OrderRecord> = self.base.db().select(thing).await?;
        Ok(order)
    }

    /// 某桌台的所有订单，新的在前
    pub async fn find_by_table(&self, table_number: u32) -> RepoResult<Vec<OrderRecord>> {
        let orders: Vec<OrderRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM order WHERE table_number = $table_number \
                 ORDER BY created_at DESC",
            )
            .bind(("table_number", table_number))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// 更新订单状态 (部分更新，只触碰 status 和 updated_at)
    pub async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        now_millis: i64,
    ) -> RepoResult<OrderRecord> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid order ID: {}", id)))?;

        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET status = $status, updated_at = $now")
            .bind(("thing", thing))
            .bind(("status", status))
            .bind(("now", now_millis))
            .await?;
        let updated: Vec<OrderRecord> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// 删除订单，返回是否确有删除
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid order ID: {}", id)))?;
        let deleted: Option<OrderRecord> = self.base.db().delete(thing).await?;
        Ok(deleted.is_some())
    }
}

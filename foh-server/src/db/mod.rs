//! Database Module
//!
//! 嵌入式 SurrealDB 连接与初始化。

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "foh";
const DATABASE: &str = "foh";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// 打开 RocksDB 持久化存储
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        Self::init(db).await
    }

    /// 打开内存存储 (测试用)
    pub async fn memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_schema(&db).await?;
        tracing::info!("Database connection established");
        Ok(Self { db })
    }
}

/// 建立索引
///
/// - `session_token` 全局唯一 (历史会话也不允许重复)
/// - `username` 全局唯一
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "DEFINE INDEX IF NOT EXISTS uniq_session_token \
         ON TABLE table_session FIELDS session_token UNIQUE;",
    )
    .query(
        "DEFINE INDEX IF NOT EXISTS idx_session_table \
         ON TABLE table_session FIELDS table_number, is_active;",
    )
    .query(
        "DEFINE INDEX IF NOT EXISTS uniq_username \
         ON TABLE employee FIELDS username UNIQUE;",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;
    Ok(())
}

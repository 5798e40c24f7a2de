//! Table Session Repository
//!
//! "一张桌台最多一个活跃会话"的不变量在这里落地：
//! 检查与创建在同一个存储事务内完成，两个并发的生成请求
//! 不可能都通过检查 (不是应用层的 check-then-insert)。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{TableSessionCreate, TableSessionRecord};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

/// 事务内的冲突标记，映射为 [`RepoError::TableActive`]
const TABLE_ACTIVE_MARKER: &str = "table_active";

/// 原子条件创建：桌台存在活跃会话时 THROW，否则 CREATE。
/// LET = 语句 0，IF = 语句 1，CREATE = 语句 2。
const CREATE_IF_FREE: &str = "\
BEGIN TRANSACTION;\n\
LET $active = (SELECT VALUE id FROM table_session WHERE table_number = $table_number AND is_active = true);\n\
IF array::len($active) > 0 { THROW 'table_active' };\n\
CREATE table_session CONTENT {\n\
    table_number: $table_number,\n\
    session_token: $session_token,\n\
    is_active: true,\n\
    created_at: $created_at,\n\
    created_by: $created_by\n\
};\n\
COMMIT TRANSACTION;";

#[derive(Clone)]
pub struct TableSessionRepository {
    base: BaseRepository,
}

impl TableSessionRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 仅当桌台没有活跃会话时创建新会话 (原子)
    ///
    /// # 错误
    ///
    /// 桌台已有活跃会话返回 [`RepoError::TableActive`]
    pub async fn create_if_table_free(
        &self,
        data: TableSessionCreate,
    ) -> RepoResult<TableSessionRecord> {
        let table_number = data.table_number;
        let map_err = |e: surrealdb::Error| {
            let msg = e.to_string();
            if msg.contains(TABLE_ACTIVE_MARKER) {
                RepoError::TableActive(table_number)
            } else {
                RepoError::Database(msg)
            }
        };

        let mut response = self
            .base
            .db()
            .query(CREATE_IF_FREE)
            .bind(("table_number", data.table_number))
            .bind(("session_token", data.session_token))
            .bind(("created_at", data.created_at))
            .bind(("created_by", data.created_by))
            .await
            .map_err(map_err)?;

        let created: Option<TableSessionRecord> = response.take(2).map_err(map_err)?;
        created.ok_or_else(|| RepoError::Database("Failed to create table session".to_string()))
    }

    /// 按令牌查找 (只读，不触碰任何状态)
    pub async fn find_by_token(&self, token: &str) -> RepoResult<Option<TableSessionRecord>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM table_session WHERE session_token = $tok LIMIT 1")
            .bind(("tok", token.to_string()))
            .await?;
        let sessions: Vec<TableSessionRecord> = result.take(0)?;
        Ok(sessions.into_iter().next())
    }

    /// 按 id 查找
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<TableSessionRecord>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid session ID: {}", id)))?;
        let session: Option<TableSessionRecord> = self.base.db().select(thing).await?;
        Ok(session)
    }

    /// 将会话置为过期
    ///
    /// 条件更新：仅在会话仍活跃时写入。返回 `(记录, 是否本次过期)`；
    /// 对已过期会话重复调用是无副作用的成功 (幂等)。
    pub async fn expire(
        &self,
        id: &str,
        now_millis: i64,
    ) -> RepoResult<(TableSessionRecord, bool)> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid session ID: {}", id)))?;

        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $thing SET is_active = false, expires_at = $now \
                 WHERE is_active = true",
            )
            .bind(("thing", thing))
            .bind(("now", now_millis))
            .await?;
        let updated: Vec<TableSessionRecord> = result.take(0)?;

        if let Some(record) = updated.into_iter().next() {
            return Ok((record, true));
        }

        // 未命中条件：要么已过期 (no-op 成功)，要么不存在
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Session {} not found", id)))?;
        Ok((existing, false))
    }

    /// 创建时间在 `[start, end)` 内的会话，新的在前 (含已过期)
    pub async fn find_created_between(
        &self,
        start_millis: i64,
        end_millis: i64,
    ) -> RepoResult<Vec<TableSessionRecord>> {
        let sessions: Vec<TableSessionRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM table_session \
                 WHERE created_at >= $start AND created_at < $end \
                 ORDER BY created_at DESC",
            )
            .bind(("start", start_millis))
            .bind(("end", end_millis))
            .await?
            .take(0)?;
        Ok(sessions)
    }

    /// 过期所有活跃会话 (打烊清扫)，返回被过期的记录
    pub async fn expire_all_active(&self, now_millis: i64) -> RepoResult<Vec<TableSessionRecord>> {
        let swept: Vec<TableSessionRecord> = self
            .base
            .db()
            .query(
                "UPDATE table_session SET is_active = false, expires_at = $now \
                 WHERE is_active = true",
            )
            .bind(("now", now_millis))
            .await?
            .take(0)?;
        Ok(swept)
    }
}

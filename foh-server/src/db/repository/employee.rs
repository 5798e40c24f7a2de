//! Employee Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{EmployeeCreate, EmployeeRecord};
use shared::models::Role;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "employee";

#[derive(Clone)]
pub struct EmployeeRepository {
    base: BaseRepository,
}

impl EmployeeRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 创建员工账号
    ///
    /// 用户名唯一性由存储索引保证，冲突映射为 Duplicate。
    pub async fn create(&self, data: EmployeeCreate) -> RepoResult<EmployeeRecord> {
        let username = data.username.clone();
        let created: Option<EmployeeRecord> = self
            .base
            .db()
            .create(TABLE)
            .content(data)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("uniq_username") {
                    RepoError::Duplicate(format!("Username '{}' already taken", username))
                } else {
                    RepoError::Database(msg)
                }
            })?;
        created.ok_or_else(|| RepoError::Database("Failed to create employee".to_string()))
    }

    /// 按用户名查找
    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<EmployeeRecord>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM employee WHERE username = $username LIMIT 1")
            .bind(("username", username.to_string()))
            .await?;
        let employees: Vec<EmployeeRecord> = result.take(0)?;
        Ok(employees.into_iter().next())
    }

    /// 按 id 查找
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<EmployeeRecord>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid employee ID: {}", id)))?;
        let employee: Option<EmployeeRecord> = self.base.db().select(thing).await?;
        Ok(employee)
    }

    /// 设置审批标志
    pub async fn set_approved(&self, id: &str, approved: bool) -> RepoResult<EmployeeRecord> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid employee ID: {}", id)))?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET is_approved = $approved")
            .bind(("thing", thing))
            .bind(("approved", approved))
            .await?;
        let updated: Vec<EmployeeRecord> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Employee {} not found", id)))
    }

    /// 变更角色
    pub async fn set_role(&self, id: &str, role: Role) -> RepoResult<EmployeeRecord> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid employee ID: {}", id)))?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET role = $role")
            .bind(("thing", thing))
            .bind(("role", role))
            .await?;
        let updated: Vec<EmployeeRecord> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Employee {} not found", id)))
    }

    /// 删除账号，返回是否确有删除
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid employee ID: {}", id)))?;
        let deleted: Option<EmployeeRecord> = self.base.db().delete(thing).await?;
        Ok(deleted.is_some())
    }
}

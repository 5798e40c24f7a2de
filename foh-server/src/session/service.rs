//! 桌台会话服务
//!
//! 所有会话生命周期操作的唯一入口。repository 保证存储不变量，
//! 这里负责令牌生成、营业日换算和事件发射。事件发射永远不影响
//! 操作本身的成败。

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use shared::event::ServerEvent;
use shared::message::Room;
use shared::models::{InvalidReason, SessionStats, SessionValidation, TableSession};

use crate::db::repository::TableSessionRepository;
use crate::realtime::EventBus;
use crate::utils::error::{AppError, AppResult};
use crate::utils::time::{business_day_bounds, current_business_date};
use crate::utils::token::generate_session_token;

/// 桌台会话服务
#[derive(Clone)]
pub struct SessionService {
    repo: TableSessionRepository,
    bus: Arc<EventBus>,
    cutoff: NaiveTime,
}

impl SessionService {
    pub fn new(repo: TableSessionRepository, bus: Arc<EventBus>, cutoff: NaiveTime) -> Self {
        Self { repo, bus, cutoff }
    }

    /// 为桌台生成新会话
    ///
    /// 原子性由存储层保证：同一桌台并发生成时至多一个成功，
    /// 其余收到冲突。成功后向 staff 房间广播 `sessionCreated`。
    pub async fn generate(&self, table_number: u32, created_by: &str) -> AppResult<TableSession> {
        if table_number == 0 {
            return Err(AppError::validation("Table number must be positive"));
        }

        let token = generate_session_token()?;
        let record = self
            .repo
            .create_if_table_free(crate::db::models::TableSessionCreate {
                table_number,
                session_token: token,
                is_active: true,
                created_at: Utc::now().timestamp_millis(),
                created_by: created_by.to_string(),
            })
            .await?;

        let session = record.into_shared();
        tracing::info!(
            table = table_number,
            session = %session.id,
            by = created_by,
            "Table session created"
        );
        self.bus
            .emit_to_room(&Room::Staff, &ServerEvent::SessionCreated(session.clone()));
        Ok(session)
    }

    /// 校验会话令牌 (纯查询，不触碰任何状态)
    pub async fn validate(&self, token: &str) -> AppResult<SessionValidation> {
        let Some(record) = self.repo.find_by_token(token).await? else {
            return Ok(SessionValidation::Invalid {
                reason: InvalidReason::NotFound,
            });
        };
        if !record.is_active {
            return Ok(SessionValidation::Invalid {
                reason: InvalidReason::Expired,
            });
        }
        Ok(SessionValidation::Valid {
            table_number: record.table_number,
        })
    }

    /// 按令牌取活跃会话的桌号，无效令牌报错
    ///
    /// 客人下单路径用：订单必须锚定在一个活跃会话上。
    pub async fn table_for_token(&self, token: &str) -> AppResult<u32> {
        match self.validate(token).await? {
            SessionValidation::Valid { table_number } => Ok(table_number),
            SessionValidation::Invalid { reason } => Err(match reason {
                InvalidReason::NotFound => AppError::InvalidToken,
                InvalidReason::Expired => AppError::TokenExpired,
            }),
        }
    }

    /// 手动过期会话 (幂等)
    ///
    /// 仅在活跃→过期的真实转换上发事件；重复调用是无副作用的
    /// 成功，不会重复广播。`expired_by` 是执行操作的员工，进审计日志。
    pub async fn expire(&self, id: &str, expired_by: &str) -> AppResult<TableSession> {
        let (record, transitioned) = self.repo.expire(id, Utc::now().timestamp_millis()).await?;
        let session = record.into_shared();

        if transitioned {
            tracing::info!(
                session = %session.id,
                table = session.table_number,
                by = expired_by,
                "Table session expired"
            );
            self.emit_expired(&session);
        }
        Ok(session)
    }

    /// 当前营业日的所有会话 (含已过期)，新的在前
    pub async fn list_today(&self) -> AppResult<Vec<TableSession>> {
        let (start, end) = business_day_bounds(current_business_date(self.cutoff), self.cutoff);
        let records = self.repo.find_created_between(start, end).await?;
        Ok(records.into_iter().map(|r| r.into_shared()).collect())
    }

    /// 当前营业日统计
    pub async fn stats_today(&self) -> AppResult<(SessionStats, NaiveDate)> {
        let date = current_business_date(self.cutoff);
        let sessions = self.list_today().await?;
        Ok((SessionStats::from_sessions(&sessions), date))
    }

    /// 打烊清扫：过期所有活跃会话，逐个发事件
    pub async fn expire_end_of_day(&self) -> AppResult<usize> {
        let swept = self
            .repo
            .expire_all_active(Utc::now().timestamp_millis())
            .await?;
        let count = swept.len();
        for record in swept {
            let session = record.into_shared();
            self.emit_expired(&session);
        }
        if count > 0 {
            tracing::info!(count, "End-of-day sweep expired active sessions");
        }
        Ok(count)
    }

    fn emit_expired(&self, session: &TableSession) {
        let event = ServerEvent::SessionExpired {
            id: session.id.clone(),
            table_number: session.table_number,
        };
        self.bus.emit_to_room(&Room::Staff, &event);
        self.bus
            .emit_to_room(&Room::Table(session.table_number), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use chrono::NaiveTime;

    async fn service() -> SessionService {
        let db = DbService::memory().await.unwrap();
        SessionService::new(
            TableSessionRepository::new(db.db.clone()),
            Arc::new(EventBus::new()),
            NaiveTime::MIN,
        )
    }

    #[tokio::test]
    async fn test_generate_then_validate() {
        let svc = service().await;
        let session = svc.generate(7, "employee:admin").await.unwrap();
        assert!(session.is_active);
        assert_eq!(session.session_token.len(), 64);

        let validation = svc.validate(&session.session_token).await.unwrap();
        assert_eq!(
            validation,
            SessionValidation::Valid { table_number: 7 }
        );
    }

    #[tokio::test]
    async fn test_second_generate_conflicts_while_active() {
        let svc = service().await;
        svc.generate(3, "employee:admin").await.unwrap();
        let err = svc.generate(3, "employee:admin").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_expire_is_idempotent_and_frees_table() {
        let svc = service().await;
        let session = svc.generate(5, "employee:admin").await.unwrap();

        let expired = svc.expire(&session.id, "employee:admin").await.unwrap();
        assert!(!expired.is_active);
        assert!(expired.expires_at.is_some());

        // 重复过期：成功，状态不变
        let again = svc.expire(&session.id, "employee:admin").await.unwrap();
        assert_eq!(again.expires_at, expired.expires_at);

        // 桌台释放后可再次生成
        let next = svc.generate(5, "employee:admin").await.unwrap();
        assert_ne!(next.session_token, session.session_token);
    }

    #[tokio::test]
    async fn test_validate_is_pure() {
        let svc = service().await;
        let session = svc.generate(2, "employee:admin").await.unwrap();
        for _ in 0..3 {
            assert!(svc.validate(&session.session_token).await.unwrap().is_valid());
        }
        svc.expire(&session.id, "employee:admin").await.unwrap();
        assert_eq!(
            svc.validate(&session.session_token).await.unwrap(),
            SessionValidation::Invalid {
                reason: InvalidReason::Expired
            }
        );
    }

    #[tokio::test]
    async fn test_stats_counts_expired_sessions() {
        let svc = service().await;
        let a = svc.generate(1, "employee:admin").await.unwrap();
        svc.generate(2, "employee:admin").await.unwrap();
        svc.expire(&a.id, "employee:admin").await.unwrap();

        let (stats, _date) = svc.stats_today().await.unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.expired_count, 1);
    }

    #[tokio::test]
    async fn test_end_of_day_sweep() {
        let svc = service().await;
        svc.generate(1, "employee:admin").await.unwrap();
        svc.generate(2, "employee:admin").await.unwrap();

        assert_eq!(svc.expire_end_of_day().await.unwrap(), 2);
        // 二次清扫无事可做
        assert_eq!(svc.expire_end_of_day().await.unwrap(), 0);

        let (stats, _) = svc.stats_today().await.unwrap();
        assert_eq!(stats.active_count, 0);
    }
}

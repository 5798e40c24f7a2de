//! 会话生命周期集成测试
//!
//! 覆盖核心不变量：同一桌台至多一个活跃会话 (并发下也成立)、
//! 校验纯查询、过期幂等、过期后桌台可复用。

use std::sync::Arc;

use chrono::NaiveTime;
use foh_server::db::DbService;
use foh_server::db::repository::TableSessionRepository;
use foh_server::utils::AppError;
use foh_server::{EventBus, SessionService};
use shared::models::{InvalidReason, SessionValidation};

async fn service() -> SessionService {
    let db = DbService::memory().await.unwrap();
    SessionService::new(
        TableSessionRepository::new(db.db.clone()),
        Arc::new(EventBus::new()),
        NaiveTime::MIN,
    )
}

#[tokio::test]
async fn test_concurrent_generate_has_single_winner() {
    let svc = service().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.generate(12, "employee:admin").await
        }));
    }

    let mut won = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }

    assert_eq!(won, 1, "Exactly one generate must win");
    assert_eq!(conflicts, 7);

    // 赢家的会话仍然可校验
    let sessions = svc.list_today().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_active);
}

#[tokio::test]
async fn test_full_token_lifecycle() {
    let svc = service().await;

    // 未知令牌
    assert_eq!(
        svc.validate("not-a-real-token").await.unwrap(),
        SessionValidation::Invalid {
            reason: InvalidReason::NotFound
        }
    );

    let session = svc.generate(4, "employee:anna").await.unwrap();
    assert_eq!(
        svc.validate(&session.session_token).await.unwrap(),
        SessionValidation::Valid { table_number: 4 }
    );

    svc.expire(&session.id, "employee:admin").await.unwrap();
    assert_eq!(
        svc.validate(&session.session_token).await.unwrap(),
        SessionValidation::Invalid {
            reason: InvalidReason::Expired
        }
    );

    // 过期后的令牌不再能锚定订单
    assert!(matches!(
        svc.table_for_token(&session.session_token).await,
        Err(AppError::TokenExpired)
    ));
}

#[tokio::test]
async fn test_expired_table_accepts_new_session() {
    let svc = service().await;
    let first = svc.generate(9, "employee:anna").await.unwrap();

    // 活跃期间：冲突
    assert!(matches!(
        svc.generate(9, "employee:anna").await,
        Err(AppError::Conflict(_))
    ));

    svc.expire(&first.id, "employee:anna").await.unwrap();
    let second = svc.generate(9, "employee:anna").await.unwrap();
    assert_ne!(second.session_token, first.session_token);

    // 旧令牌保持过期，新令牌有效
    assert!(!svc.validate(&first.session_token).await.unwrap().is_valid());
    assert!(svc.validate(&second.session_token).await.unwrap().is_valid());
}

#[tokio::test]
async fn test_end_of_day_sweep_frees_all_tables() {
    let svc = service().await;
    for table in 1..=3 {
        svc.generate(table, "employee:admin").await.unwrap();
    }

    assert_eq!(svc.expire_end_of_day().await.unwrap(), 3);

    // 所有桌台立即可复用
    for table in 1..=3 {
        svc.generate(table, "employee:admin").await.unwrap();
    }
    let (stats, _) = svc.stats_today().await.unwrap();
    assert_eq!(stats.total_count, 6);
    assert_eq!(stats.active_count, 3);
}

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{EmployeeRepository, OrderRepository, TableSessionRepository};
use crate::realtime::{EventBus, HandshakeAuth};
use crate::session::SessionService;
use crate::utils::error::{AppError, AppResult};

/// 服务器状态 — 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。事件总线通过这里
/// 注入到每个需要发事件的服务，handler 不做全局查找。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 |
/// | jwt_service | JWT 认证服务 |
/// | bus | 实时事件总线 |
/// | sessions | 桌台会话服务 |
/// | orders / employees | repository 直连 (handler 层使用) |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub jwt_service: Arc<JwtService>,
    pub bus: Arc<EventBus>,
    pub sessions: SessionService,
    pub session_repo: TableSessionRepository,
    pub orders: OrderRepository,
    pub employees: EmployeeRepository,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 顺序：工作目录 → 数据库 → JWT / 总线 → 各 repository / 服务
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        let db_path = config.database_dir().join("foh.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;
        Ok(Self::from_db(config.clone(), db_service))
    }

    /// 内存数据库状态 (测试用)
    pub async fn initialize_in_memory(config: &Config) -> AppResult<Self> {
        let db_service = DbService::memory().await?;
        Ok(Self::from_db(config.clone(), db_service))
    }

    fn from_db(config: Config, db_service: DbService) -> Self {
        let db = db_service.db;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let bus = Arc::new(EventBus::new());

        let session_repo = TableSessionRepository::new(db.clone());
        let sessions = SessionService::new(session_repo.clone(), bus.clone(), config.cutoff());
        let orders = OrderRepository::new(db.clone());
        let employees = EmployeeRepository::new(db.clone());

        Self {
            config,
            db,
            jwt_service,
            bus,
            sessions,
            session_repo,
            orders,
            employees,
        }
    }

    /// 实时通道的握手校验器
    pub fn handshake_auth(&self) -> HandshakeAuth {
        HandshakeAuth::new(self.jwt_service.clone(), self.session_repo.clone())
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}

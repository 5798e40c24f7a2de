use std::path::PathBuf;

use chrono::NaiveTime;

use crate::auth::JwtConfig;
use crate::utils::time::parse_cutoff;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/foh | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP API 端口 |
/// | BUS_TCP_PORT | 8081 | 实时事件总线 TCP 端口 |
/// | CUSTOMER_APP_BASE | http://localhost:5173 | 客人点餐页基础 URL |
/// | BUSINESS_DAY_CUTOFF | 04:00 | 营业日切换时刻 (HH:MM，本地时区) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/foh HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库与日志文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 实时事件总线 TCP 端口 (客户端直连)
    pub bus_tcp_port: u16,
    /// 客人扫码落地页的基础 URL
    pub customer_app_base: String,
    /// 营业日切换时刻 (HH:MM)
    pub business_day_cutoff: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/foh".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            bus_tcp_port: std::env::var("BUS_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            customer_app_base: std::env::var("CUSTOMER_APP_BASE")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            business_day_cutoff: std::env::var("BUSINESS_DAY_CUTOFF")
                .unwrap_or_else(|_| "04:00".into()),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置 (测试用)
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        bus_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.bus_tcp_port = bus_tcp_port;
        config
    }

    /// 数据库文件目录: `<work_dir>/database`
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录: `<work_dir>/logs`
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// 解析后的营业日切换时刻
    pub fn cutoff(&self) -> NaiveTime {
        parse_cutoff(&self.business_day_cutoff)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

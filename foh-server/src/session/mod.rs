//! 桌台会话业务层

pub mod service;

pub use service::SessionService;

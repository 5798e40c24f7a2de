//! 工具模块

pub mod error;
pub mod logger;
pub mod time;
pub mod token;

pub use error::{AppError, AppResult};

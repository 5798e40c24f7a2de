//! 会话令牌生成
//!
//! 令牌是客人侧的唯一凭证，必须不可猜测：
//! 32 字节 CSPRNG 随机数，hex 编码为 64 字符。
//! 全局唯一性由存储层的唯一索引兜底。

use ring::rand::{SecureRandom, SystemRandom};

use super::AppError;

const TOKEN_BYTES: usize = 32;

/// 生成一个新的会话令牌
pub fn generate_session_token() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::internal("Failed to generate session token"))?;
    Ok(hex::encode(bytes))
}

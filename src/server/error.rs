use thiserror::Error;

use crate::api::tls::TlsError;
use crate::redis::RedisPoolError;

/// 伺服器錯誤類型
#[derive(Error, Debug)]
pub enum ServerError {
    /// 配置錯誤
    #[error("配置錯誤: {0}")]
    Config(String),

    /// 資料庫連接錯誤
    #[error("資料庫連接錯誤: {0}")]
    Database(String),

    /// Redis 連接池錯誤
    #[error("Redis 連接池錯誤: {0}")]
    Cache(#[from] RedisPoolError),

    /// 證書載入錯誤
    #[error("TLS 錯誤: {0}")]
    Tls(#[from] TlsError),

    /// IO 錯誤
    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    /// 運行時錯誤
    #[error("運行時錯誤: {0}")]
    Runtime(String),
}

/// 伺服器結果類型別名
pub type ServerResult<T> = Result<T, ServerError>;

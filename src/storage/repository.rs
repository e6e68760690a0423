use sqlx::MySqlPool;
use thiserror::Error;

pub mod user;

pub use user::{MySqlUserRepository, UserRepository};

/// 存儲層錯誤
#[derive(Debug, Error)]
pub enum StorageError {
    /// 資料庫錯誤
    #[error("資料庫錯誤: {0}")]
    Database(#[from] sqlx::Error),

    /// 記錄不存在
    #[error("{entity} 不存在: ID {id}")]
    NotFound { entity: &'static str, id: i64 },
}

/// 通用的數據庫操作特性
pub trait DbExecutor {
    fn get_pool(&self) -> &MySqlPool;
}

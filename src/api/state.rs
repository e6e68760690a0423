use sqlx::MySqlPool;
use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::redis::KvClient;
use crate::storage::UserRepository;

/// 處理器共享的應用狀態
///
/// 未啟用的後端為 `None`，處理器據此回報錯誤而不是 panic。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApplicationConfig>,
    pub db: Option<MySqlPool>,
    pub users: Option<Arc<dyn UserRepository>>,
    pub cache: Option<KvClient>,
}

impl AppState {
    /// 不連接任何後端的狀態
    pub fn new(config: Arc<ApplicationConfig>) -> Self {
        Self {
            config,
            db: None,
            users: None,
            cache: None,
        }
    }

    pub fn with_database(mut self, pool: MySqlPool, users: Arc<dyn UserRepository>) -> Self {
        self.db = Some(pool);
        self.users = Some(users);
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_cache(mut self, cache: KvClient) -> Self {
        self.cache = Some(cache);
        self
    }
}

//! 集中化的 Redis 測試配置
//!
//! 提供一致的測試環境配置，支援不同部署環境（本地開發、Docker 容器）。
//! 無法連上 Redis 時，依賴真實服務的測試會跳過而不是失敗。

use crate::config::types::RedisConfig;
use crate::redis::pool::{ConnectionPool, RedisPool, RedisPoolError};
use std::sync::Arc;

/// Redis 測試配置建構器
pub struct RedisTestConfig;

impl RedisTestConfig {
    /// 獲取測試用 Redis 主機
    ///
    /// 優先級：
    /// 1. REDIS_TEST_HOST 環境變數
    /// 2. 檢測 Docker 環境使用 redis
    /// 3. 預設 127.0.0.1
    pub fn get_test_host() -> String {
        if let Ok(host) = std::env::var("REDIS_TEST_HOST") {
            return host;
        }

        if Self::is_docker_environment() {
            "redis".to_string()
        } else {
            "127.0.0.1".to_string()
        }
    }

    /// 獲取測試用 Redis 端口，未設置或無法解析時為 6379
    pub fn get_test_port() -> u16 {
        std::env::var("REDIS_TEST_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(6379)
    }

    /// 檢測是否在 Docker 環境中執行
    fn is_docker_environment() -> bool {
        std::env::var("DOCKER_CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists()
    }

    /// 建立標準測試 Redis 配置
    pub fn create_test_config() -> RedisConfig {
        RedisConfig {
            enable: true,
            host: Self::get_test_host(),
            port: Self::get_test_port(),
            password: std::env::var("REDIS_TEST_PASSWORD").unwrap_or_default(),
            max_idle: 2,
            max_active: 3,
            dial_timeout_secs: 2,
            ..RedisConfig::default()
        }
    }

    /// 建立測試用 Redis 連接池
    pub async fn create_test_pool() -> Result<Arc<ConnectionPool>, RedisPoolError> {
        let pool = ConnectionPool::new(Self::create_test_config()).await?;
        Ok(Arc::new(pool))
    }

    /// 可用時返回連接池，否則印出提示並返回 `None`
    pub async fn live_pool(test_name: &str) -> Option<Arc<ConnectionPool>> {
        match Self::create_test_pool().await {
            Ok(pool) if pool.check_health().await => Some(pool),
            _ => {
                eprintln!("跳過 Redis 測試 '{}'：Redis 環境不可用", test_name);
                None
            }
        }
    }
}

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::ConnectOptions;
use tracing::info;

/// 資料庫池類型
pub type DatabasePool = MySqlPool;

/// 由配置建立連接選項
///
/// 只有 `debug` 開啟時才記錄每條 SQL 語句。
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.db_name)
        .charset("utf8mb4");

    if config.debug {
        options
    } else {
        options.disable_statement_logging()
    }
}

/// 初始化資料庫連接池
///
/// 連接數與生命週期套用配置中的下限，建立後以 `SELECT 1` 驗證連通性。
pub async fn init_pool(config: &DatabaseConfig) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections())
        .min_connections(config.min_connections())
        .max_lifetime(config.max_lifetime())
        .connect_with(connect_options(config))
        .await
        .with_context(|| format!("無法連接資料庫 {}:{}/{}", config.host, config.port, config.db_name))?;

    // 測試連接
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("資料庫連通性檢查失敗")?;

    info!(
        "資料庫連接池初始化完成: {}:{}/{}，最大連接數: {}",
        config.host,
        config.port,
        config.db_name,
        config.max_connections()
    );
    Ok(pool)
}

/// 健康檢查
pub async fn ping(pool: &MySqlPool) -> bool {
    sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
}

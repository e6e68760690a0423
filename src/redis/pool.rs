use crate::config::types::RedisConfig;
use async_trait::async_trait;
use deadpool::managed::{QueueMode, Status};
use deadpool_redis::{
    redis::{aio::ConnectionLike, cmd, RedisError},
    Config, Connection, ConnectionAddr, ConnectionInfo, CreatePoolError, Pool, PoolConfig,
    PoolError, RedisConnectionInfo, Runtime, Timeouts,
};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 閒置連接回收的最短掃描間隔
const MIN_REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Redis連接池錯誤
#[derive(Error, Debug)]
pub enum RedisPoolError {
    /// 連接池初始化錯誤
    #[error("Redis連接池初始化錯誤: {0}")]
    PoolInitError(String),

    /// 撥號或認證失敗
    #[error("Redis建立連接失敗: {0}")]
    DialError(#[from] RedisError),

    /// 無法獲取連接
    #[error("無法從連接池獲取連接: {0}")]
    GetConnectionError(String),

    /// 連接池已關閉
    #[error("Redis連接池已關閉")]
    Closed,
}

/// 從deadpool-redis錯誤轉換為RedisPoolError
impl From<PoolError> for RedisPoolError {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::Backend(e) => RedisPoolError::DialError(e),
            PoolError::Closed => RedisPoolError::Closed,
            other => RedisPoolError::GetConnectionError(other.to_string()),
        }
    }
}

/// 從deadpool-redis創建錯誤轉換為RedisPoolError
impl From<CreatePoolError> for RedisPoolError {
    fn from(error: CreatePoolError) -> Self {
        RedisPoolError::PoolInitError(error.to_string())
    }
}

/// Redis連接池接口
///
/// 取得的連接在被丟棄時自動歸還，因此任何退出路徑（包括錯誤與 panic）都會釋放連接。
#[async_trait]
pub trait RedisPool: Send + Sync + 'static {
    /// 連接池借出的連接類型
    type Connection: ConnectionLike + Send;

    /// 獲取連接，連接池耗盡時等待直到有連接歸還
    async fn get_conn(&self) -> Result<Self::Connection, RedisPoolError>;

    /// 獲取連接池大小（同時借出的連接上限）
    fn pool_size(&self) -> u32;

    /// 檢查連接池健康狀態
    async fn check_health(&self) -> bool {
        match self.get_conn().await {
            Ok(mut conn) => {
                let result: Result<String, RedisError> = cmd("PING").query_async(&mut conn).await;
                match result {
                    Ok(pong) => pong == "PONG",
                    Err(e) => {
                        error!("Redis健康檢查錯誤: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                error!("Redis健康檢查無法獲取連接: {}", e);
                false
            }
        }
    }
}

/// Redis連接池實現
pub struct ConnectionPool {
    pool: Pool,
    config: RedisConfig,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// 創建新的Redis連接池
    ///
    /// 連接在首次需要時才撥號；密碼非空時每條新連接撥號後執行一次 AUTH。
    pub async fn new(config: RedisConfig) -> Result<Self, RedisPoolError> {
        let mut cfg = Config::from_connection_info(connection_info(&config));

        // 等待連接不設超時，撥號超時只在建立新連接時生效
        cfg.pool = Some(PoolConfig {
            max_size: config.max_active as usize,
            timeouts: Timeouts {
                wait: None,
                create: Some(config.dial_timeout()),
                recycle: Some(config.dial_timeout()),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        let reaper = spawn_idle_reaper(pool.clone(), &config);

        info!(
            "Redis連接池初始化完成: {}，最大連接數: {}，最大閒置數: {}",
            config.address(),
            config.max_active,
            config.max_idle
        );

        Ok(Self {
            pool,
            config,
            reaper: Mutex::new(reaper),
        })
    }

    /// 連接池當前狀態
    pub fn status(&self) -> Status {
        self.pool.status()
    }

    /// 關閉連接池，之後的獲取請求返回 `RedisPoolError::Closed`
    pub fn close(&self) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
        }
        self.pool.close();
        info!("Redis連接池已關閉: {}", self.config.address());
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl RedisPool for ConnectionPool {
    type Connection = Connection;

    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        match self.pool.get().await {
            Ok(conn) => {
                debug!("從Redis連接池獲取連接成功");
                Ok(conn)
            }
            Err(e) => {
                debug!("無法從Redis連接池獲取連接: {}", e);
                Err(e.into())
            }
        }
    }

    fn pool_size(&self) -> u32 {
        self.config.max_active
    }
}

/// Arc<ConnectionPool> 也實現 RedisPool trait，便於共享連接池
#[async_trait]
impl RedisPool for Arc<ConnectionPool> {
    type Connection = Connection;

    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        (**self).get_conn().await
    }

    fn pool_size(&self) -> u32 {
        (**self).pool_size()
    }
}

fn connection_info(config: &RedisConfig) -> ConnectionInfo {
    let password = (!config.password.is_empty()).then(|| config.password.clone());

    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            password,
            ..RedisConnectionInfo::default()
        },
    }
}

/// 定期回收閒置過久或超出 `max_idle` 的連接
fn spawn_idle_reaper(pool: Pool, config: &RedisConfig) -> Option<JoinHandle<()>> {
    let idle_timeout = config.idle_timeout();
    let max_idle = config.max_idle as usize;

    if idle_timeout.is_none() && max_idle >= config.max_active as usize {
        return None;
    }

    let period = idle_timeout
        .map(|timeout| (timeout / 2).max(MIN_REAP_INTERVAL))
        .unwrap_or(MIN_REAP_INTERVAL);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            let removed = reap_idle(&pool, max_idle, idle_timeout);
            if removed > 0 {
                debug!("回收閒置Redis連接 {} 條", removed);
            }
        }
    }))
}

fn reap_idle(pool: &Pool, max_idle: usize, idle_timeout: Option<Duration>) -> usize {
    let excess = Cell::new(pool.status().available.saturating_sub(max_idle));

    let result = pool.retain(|_, metrics| {
        if idle_timeout.is_some_and(|timeout| metrics.last_used() > timeout) {
            return false;
        }
        if excess.get() > 0 {
            excess.set(excess.get() - 1);
            return false;
        }
        true
    });

    result.removed.len()
}

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use crate::api::{tls, AppState, RestApi};
use crate::config::types::ApplicationConfig;
use crate::config::Validator;
use crate::redis::{ConnectionPool, KvClient, RedisPool};
use crate::server::{ServerError, ServerResult, ServerState};
use crate::storage::{database, MySqlUserRepository};

/// 伺服器實例
pub struct Server {
    /// 伺服器狀態
    state: Arc<RwLock<ServerState>>,
    /// 處理器共享狀態
    app_state: AppState,
    /// Redis 連接池，關閉時釋放
    cache_pool: Option<Arc<ConnectionPool>>,
    /// 啟用 HTTPS 時的握手器
    tls: Option<TlsAcceptor>,
}

impl Server {
    /// 啟動 HTTP 服務（啟用時同時啟動 HTTPS），直到 `shutdown` 完成後關閉
    pub async fn run<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.mark_running().await;
        let result = self
            .rest_api()
            .start(shutdown)
            .await
            .map_err(|e| ServerError::Runtime(format!("{:#}", e)));

        self.shutdown().await;
        result
    }

    /// 在已綁定的監聽器上運行
    ///
    /// 未啟用 HTTPS 時 `https_listener` 必須為 `None`。
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        https_listener: Option<TcpListener>,
        shutdown: F,
    ) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.mark_running().await;
        let result = self
            .rest_api()
            .serve(listener, https_listener, shutdown)
            .await
            .map_err(|e| ServerError::Runtime(format!("{:#}", e)));

        self.shutdown().await;
        result
    }

    fn rest_api(&self) -> RestApi {
        let api = RestApi::new(self.app_state.clone());
        match self.tls.clone() {
            Some(acceptor) => api.with_tls(acceptor),
            None => api,
        }
    }

    async fn mark_running(&self) {
        *self.state.write().await = ServerState::Running;
        info!("伺服器已啟動");
    }

    /// 釋放後端連接
    async fn shutdown(&self) {
        info!("正在關閉伺服器...");
        *self.state.write().await = ServerState::ShuttingDown;

        if let Some(pool) = &self.cache_pool {
            pool.close();
        }
        if let Some(pool) = &self.app_state.db {
            pool.close().await;
            info!("資料庫連接池已關閉");
        }

        *self.state.write().await = ServerState::Stopped;
        info!("伺服器已關閉");
    }

    /// 獲取伺服器狀態
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// 處理器共享狀態
    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }
}

/// 伺服器構建器
pub struct ServerBuilder {
    config: Option<ApplicationConfig>,
}

impl ServerBuilder {
    /// 創建新的伺服器構建器
    pub fn new() -> Self {
        Self { config: None }
    }

    /// 設置應用配置
    pub fn with_config(mut self, config: ApplicationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 構建並返回伺服器實例
    ///
    /// 已啟用的後端在此連接：資料庫連不上時構建失敗；
    /// Redis 連接池延遲撥號，連不上只記錄警告。
    pub async fn build(self) -> ServerResult<Server> {
        info!("構建伺服器實例");

        let config = self
            .config
            .ok_or_else(|| ServerError::Config("未提供應用配置".to_string()))?;
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let tls = if config.server.enable_https {
            info!("啟用 HTTPS，證書: {}", config.tls.cert_file);
            Some(tls::load_acceptor(&config.tls)?)
        } else {
            None
        };

        let config = Arc::new(config);
        let mut app_state = AppState::new(Arc::clone(&config));

        if config.database.enable {
            let pool = database::init_pool(&config.database)
                .await
                .map_err(|e| ServerError::Database(format!("{:#}", e)))?;
            let users = Arc::new(MySqlUserRepository::new(
                pool.clone(),
                &config.database.table_prefix,
            ));
            app_state = app_state.with_database(pool, users);
        }

        let mut cache_pool = None;
        if config.redis.enable {
            let pool = Arc::new(ConnectionPool::new(config.redis.clone()).await?);
            if !pool.check_health().await {
                warn!("Redis 暫時不可用: {}，將在請求時重試連接", config.redis.address());
            }
            app_state = app_state.with_cache(KvClient::new(Arc::clone(&pool)));
            cache_pool = Some(pool);
        }

        info!("伺服器實例構建完成");

        Ok(Server {
            state: Arc::new(RwLock::new(ServerState::Initializing)),
            app_state,
            cache_pool,
            tls,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

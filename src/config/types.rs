use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::validation::{ValidationError, ValidationUtils, Validator};

/// 應用程序配置結構
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub server: ServerConfig,
    pub tls: TlsConfig,
    #[serde(alias = "mysql")]
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(alias = "logger")]
    pub log: LogConfig,
    pub chains: HashMap<String, ChainConfig>,
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.log.validate()?;

        // HTTPS 需要證書與私鑰
        ValidationUtils::check_dependency(
            self.server.enable_https,
            !self.tls.cert_file.trim().is_empty(),
            "server.enable_https",
            "tls.cert_file",
        )?;
        ValidationUtils::check_dependency(
            self.server.enable_https,
            !self.tls.key_file.trim().is_empty(),
            "server.enable_https",
            "tls.key_file",
        )?;

        // 未啟用的區段不做驗證
        if self.database.enable {
            self.database.validate()?;
        }
        if self.redis.enable {
            self.redis.validate()?;
        }

        Ok(())
    }
}

/// 伺服器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub run_mode: String,
    pub listen_addr: String,
    /// 同時處理的請求上限，0 表示不限制
    pub limit_connection: usize,
    pub root_router_prefix: String,
    pub enable_https: bool,
    pub https_addr: String,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "api".to_string(),
            run_mode: "debug".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            limit_connection: 0,
            root_router_prefix: "/api".to_string(),
            enable_https: false,
            https_addr: "0.0.0.0:8443".to_string(),
            read_timeout_secs: 0,
            write_timeout_secs: 0,
            idle_timeout_secs: 0,
            max_header_bytes: 1 << 20,
        }
    }
}

impl Validator for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.listen_addr, "server.listen_addr")?;
        ValidationUtils::one_of(
            &self.run_mode.to_lowercase(),
            &["debug", "release", "test"],
            "server.run_mode",
        )?;

        if self.enable_https {
            ValidationUtils::not_empty(&self.https_addr, "server.https_addr")?;
        }

        Ok(())
    }
}

impl ServerConfig {
    /// 路由前綴，未設定時使用 `/api`
    pub fn router_prefix(&self) -> String {
        let prefix = self.root_router_prefix.trim();
        if prefix.is_empty() {
            return "/api".to_string();
        }
        if prefix.starts_with('/') {
            prefix.trim_end_matches('/').to_string()
        } else {
            format!("/{}", prefix.trim_end_matches('/'))
        }
    }

    /// 請求處理超時，0 表示不設定
    pub fn request_timeout(&self) -> Option<Duration> {
        seconds(self.write_timeout_secs)
    }

    /// 收齊請求頭的時限，從收到第一個位元組起算
    pub fn header_read_timeout(&self) -> Option<Duration> {
        seconds(self.read_timeout_secs)
    }

    /// 長連接等待下一個請求的時限，未設定時沿用讀取超時
    pub fn idle_timeout(&self) -> Option<Duration> {
        seconds(self.idle_timeout_secs).or_else(|| self.header_read_timeout())
    }

    /// 請求頭緩衝上限，0 表示使用預設值
    pub fn header_buffer_limit(&self) -> Option<usize> {
        (self.max_header_bytes > 0).then(|| self.max_header_bytes.max(MIN_HEADER_BUFFER))
    }
}

/// 底層解析器要求的最小讀取緩衝
const MIN_HEADER_BUFFER: usize = 8 * 1024;

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// TLS 證書配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

/// MySQL 數據庫配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub enable: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub table_prefix: String,
    pub max_open_connections: u32,
    pub max_idle_connections: u32,
    pub conn_max_lifetime_secs: u64,
    /// 啟用 SQL 語句日誌
    pub debug: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enable: false,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            db_name: String::new(),
            table_prefix: String::new(),
            max_open_connections: 10,
            max_idle_connections: 2,
            conn_max_lifetime_secs: 300,
            debug: false,
        }
    }
}

impl Validator for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.host, "database.host")?;
        ValidationUtils::not_empty(&self.user, "database.user")?;
        ValidationUtils::not_empty(&self.db_name, "database.db_name")?;
        ValidationUtils::in_range(self.port, 1, 65535, "database.port")?;

        Ok(())
    }
}

impl DatabaseConfig {
    /// 最大連接數，下限為 5
    pub fn max_connections(&self) -> u32 {
        self.max_open_connections.max(5)
    }

    /// 常駐的閒置連接數，下限為 1 且不超過最大連接數
    pub fn min_connections(&self) -> u32 {
        self.max_idle_connections.max(1).min(self.max_connections())
    }

    /// 連接最長生命週期，下限為 30 秒
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.conn_max_lifetime_secs.max(30))
    }
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enable: bool,
    pub host: String,
    pub port: u16,
    pub password: String,
    /// 閒置連接的回收時間（秒），0 表示不回收
    pub idle_timeout_secs: u64,
    pub max_idle: u32,
    pub max_active: u32,
    /// 建立新連接的超時（秒），只在撥號時生效一次
    pub dial_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enable: false,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: String::new(),
            idle_timeout_secs: 240,
            max_idle: 8,
            max_active: 32,
            dial_timeout_secs: 5,
        }
    }
}

impl Validator for RedisConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.host, "redis.host")?;
        ValidationUtils::in_range(self.port, 1, 65535, "redis.port")?;
        ValidationUtils::in_range(self.max_active, 1, 1000, "redis.max_active")?;
        ValidationUtils::in_range(self.max_idle, 0, self.max_active, "redis.max_idle")?;
        ValidationUtils::in_range(self.dial_timeout_secs, 1, 60, "redis.dial_timeout_secs")?;

        Ok(())
    }
}

impl RedisConfig {
    /// 閒置回收時間
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// 撥號超時
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// 不含密碼的連接地址，用於日誌
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// `text` 或 `json`
    #[serde(alias = "formatter")]
    pub format: String,
    pub disable_console: bool,
    /// 寫入滾動日誌檔
    pub write: bool,
    pub path: String,
    pub file_name: String,
    pub max_age_hours: u64,
    pub rotation_hours: u64,
    /// 依級別另外分檔
    pub debug: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            format: "text".to_string(),
            disable_console: false,
            write: false,
            path: std::env::temp_dir().to_string_lossy().into_owned(),
            file_name: "daily.log".to_string(),
            max_age_hours: 24 * 7,
            rotation_hours: 24,
            debug: false,
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;

        // 驗證日誌格式
        ValidationUtils::one_of(
            &self.format.to_lowercase(),
            &["text", "json"],
            "log.format",
        )?;

        if self.write {
            ValidationUtils::not_empty(&self.file_name, "log.file_name")?;
            ValidationUtils::in_range(self.rotation_hours, 1, 24 * 31, "log.rotation_hours")?;
        }

        Ok(())
    }
}

/// 外部鏈帳號配置，服務本身不解讀其內容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub account: String,
    pub secret: String,
}

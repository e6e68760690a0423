use config::{Config, ConfigError, Environment as ConfigEnvironment, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::types::ApplicationConfig;
use crate::config::validation::{ValidationError, Validator};

/// 環境變數前綴，例如 `API__REDIS__HOST=10.0.0.2`
pub const ENV_PREFIX: &str = "API";

/// 配置加載錯誤
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("配置文件不存在: {0}")]
    NotFound(PathBuf),

    #[error("配置解析失敗: {0}")]
    Parse(#[from] ConfigError),

    #[error("配置驗證失敗: {0}")]
    Invalid(#[from] ValidationError),
}

/// 配置加載器，從指定文件與環境變數組合出最終配置
pub struct ConfigLoader;

impl ConfigLoader {
    /// 載入指定路徑的配置來源，文件格式由副檔名決定（json / toml / yaml）
    pub fn load(path: &Path) -> Result<Config, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            // 環境變數優先級高於文件配置
            .add_source(
                ConfigEnvironment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config)
    }
}

impl ApplicationConfig {
    /// 從配置文件加載並驗證，驗證失敗時拒絕啟動
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        debug!("從文件加載配置: {}", path.display());

        let app_config: ApplicationConfig = ConfigLoader::load(path)?.try_deserialize()?;
        app_config.validate()?;

        debug!("配置驗證通過");
        Ok(app_config)
    }
}

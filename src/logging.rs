//! 日誌系統
//!
//! 程序啟動時依 `LogConfig` 安裝一次全局 subscriber：
//! - 控制台輸出（`disable_console` 可關閉）
//! - `write` 時寫入滾動日誌檔，保留時間由 `max_age_hours` 換算成檔案數量
//! - `write` 且 `debug` 時另外依級別分檔（`<file_name>.debug`、`.info`、`.warn`、`.error`）
//!
//! `RUST_LOG` 存在時覆蓋配置中的級別。

use anyhow::{anyhow, Context, Result};
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LogConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// 分級日誌檔對應的級別
const LEVEL_FILES: [Level; 4] = [Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR];

/// 非阻塞寫入器的守衛，需在程序結束前一直持有，否則緩衝中的日誌會遺失
#[must_use = "LogGuard 被丟棄後檔案日誌將停止寫入"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// 初始化日誌系統
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_lowercase()))
        .map_err(|e| anyhow!("無效的日誌級別 {}: {}", config.level, e))?;

    let (layers, guards) = build_layers(config)?;

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(LogGuard { _guards: guards })
}

fn build_layers(config: &LogConfig) -> Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    let json = config.format.eq_ignore_ascii_case("json");
    let mut layers = Vec::new();
    let mut guards = Vec::new();

    if !config.disable_console {
        layers.push(fmt_layer(json, std::io::stdout, true));
    }

    if config.write {
        std::fs::create_dir_all(&config.path)
            .with_context(|| format!("無法創建日誌目錄: {}", config.path))?;

        let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config, &config.file_name)?);
        layers.push(fmt_layer(json, writer, false));
        guards.push(guard);

        if config.debug {
            for level in LEVEL_FILES {
                let file_name = format!("{}.{}", config.file_name, level.as_str().to_lowercase());
                let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config, &file_name)?);
                layers.push(
                    fmt_layer(json, writer, false)
                        .with_filter(filter_fn(move |meta| *meta.level() == level))
                        .boxed(),
                );
                guards.push(guard);
            }
        }
    }

    Ok((layers, guards))
}

fn fmt_layer<W>(json: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn rolling_appender(config: &LogConfig, file_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(rotation(config))
        .filename_prefix(file_name)
        .max_log_files(retained_files(config))
        .build(&config.path)
        .with_context(|| format!("無法建立滾動日誌檔: {}/{}", config.path, file_name))
}

/// 少於一天的輪替週期按小時切檔，否則按天
fn rotation(config: &LogConfig) -> Rotation {
    if config.rotation_hours < 24 {
        Rotation::HOURLY
    } else {
        Rotation::DAILY
    }
}

/// 依保留時間換算需保留的檔案數
fn retained_files(config: &LogConfig) -> usize {
    let period_hours = if config.rotation_hours < 24 { 1 } else { 24 };
    (config.max_age_hours / period_hours).max(1) as usize
}

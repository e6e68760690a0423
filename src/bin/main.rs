use anyhow::{bail, Context, Result};
use api_template::config::ApplicationConfig;
use api_template::server::ServerBuilder;
use api_template::storage::{database, run_migrations};
use api_template::logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "api", about = "api command for starting the service", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 啟動服務：api start -c ./build/app.json
    Start {
        /// 配置檔路徑
        #[arg(short, long)]
        config: PathBuf,
    },

    /// 建立缺少的資料表：api migrate -c ./build/app.json
    Migrate {
        /// 配置檔路徑
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => start(config).await,
        Commands::Migrate { config } => migrate(config).await,
    }
}

async fn start(path: PathBuf) -> Result<()> {
    let config = ApplicationConfig::load(&path)
        .with_context(|| format!("無法載入配置: {}", path.display()))?;

    // 守衛需持有到程序結束
    let _log_guard = logging::init(&config.log)?;
    info!(
        "配置載入完成: 服務 {}，監聽 {}，資料庫 {}，Redis {}",
        config.server.name,
        config.server.listen_addr,
        if config.database.enable { "啟用" } else { "停用" },
        if config.redis.enable { "啟用" } else { "停用" }
    );

    let server = ServerBuilder::new().with_config(config).build().await?;
    server.run(shutdown_signal()).await?;
    Ok(())
}

async fn migrate(path: PathBuf) -> Result<()> {
    let config = ApplicationConfig::load(&path)
        .with_context(|| format!("無法載入配置: {}", path.display()))?;
    let _log_guard = logging::init(&config.log)?;

    if !config.database.enable {
        bail!("資料庫未啟用，無法執行遷移");
    }

    let pool = database::init_pool(&config.database)
        .await
        .context("無法初始化資料庫連接池")?;
    run_migrations(&pool, &config.database.table_prefix)
        .await
        .context("數據庫遷移執行失敗")?;
    pool.close().await;

    info!("數據庫遷移完成！");
    Ok(())
}

/// 等待 Ctrl-C
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("接收到關閉信號，正在退出..."),
        Err(err) => error!("無法監聽關閉信號: {}", err),
    }
}

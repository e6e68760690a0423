use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::api::response::{ApiResponse, CODE_NOT_FOUND, CODE_OK, CODE_UNAVAILABLE};
use crate::api::state::AppState;
use crate::storage::database;

/// 後端狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Up,
    Down,
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: BackendStatus,
    pub cache: BackendStatus,
}

pub async fn ping(State(state): State<AppState>) -> ApiResponse<String> {
    ApiResponse::new(
        0,
        "success",
        Some(format!("----{}----pong", state.config.server.name)),
    )
}

/// 回報資料庫與快取的連通性，已啟用的後端任一不可用時 `code` 為 503
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let database = match &state.db {
        Some(pool) => {
            if database::ping(pool).await {
                BackendStatus::Up
            } else {
                BackendStatus::Down
            }
        }
        None => BackendStatus::Disabled,
    };

    let cache = match &state.cache {
        Some(client) => match client.ping().await {
            Ok(()) => BackendStatus::Up,
            Err(e) => {
                warn!("快取健康檢查失敗: {}", e);
                BackendStatus::Down
            }
        },
        None => BackendStatus::Disabled,
    };

    let healthy = database != BackendStatus::Down && cache != BackendStatus::Down;
    let (code, message) = if healthy {
        (CODE_OK, "ok")
    } else {
        (CODE_UNAVAILABLE, "degraded")
    };

    ApiResponse::new(
        code,
        message,
        Some(HealthResponse {
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
            database,
            cache,
        }),
    )
}

/// 未匹配任何路由
pub async fn not_found() -> ApiResponse<()> {
    ApiResponse::error(CODE_NOT_FOUND, "The incorrect api route")
}

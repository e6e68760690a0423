use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// 成功
pub const CODE_OK: i32 = 200;
/// 路由不存在
pub const CODE_NOT_FOUND: i32 = 404;
/// 處理失敗
pub const CODE_INTERNAL_ERROR: i32 = 500;
/// 依賴的服務不可用
pub const CODE_UNAVAILABLE: i32 = 503;

/// 統一回應格式
///
/// 業務狀態放在 `code`，HTTP 狀態碼一律為 200。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(code: i32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(CODE_OK, "ok", Some(data))
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::new(code, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

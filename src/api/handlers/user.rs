use axum::extract::{rejection::JsonRejection, Json, State};
use serde_json::Value;
use tracing::{debug, error};

use crate::api::response::{ApiResponse, CODE_INTERNAL_ERROR, CODE_NOT_FOUND};
use crate::api::state::AppState;
use crate::storage::User;

/// 示範用的固定使用者ID
pub const DEMO_USER_ID: i64 = 1;

/// 原樣返回請求中的 JSON
pub async fn test_post(payload: Result<Json<Value>, JsonRejection>) -> ApiResponse<Value> {
    match payload {
        Ok(Json(body)) => {
            debug!("post body: {}", body);
            ApiResponse::ok(body)
        }
        Err(rejection) => ApiResponse::error(CODE_INTERNAL_ERROR, rejection.body_text()),
    }
}

/// 查詢示範使用者
///
/// 資料不存在時返回 `code` 404，與查詢失敗的 500 區分開；
/// 未啟用資料庫時返回 500。
pub async fn get_user(State(state): State<AppState>) -> ApiResponse<User> {
    let Some(users) = &state.users else {
        return ApiResponse::error(CODE_INTERNAL_ERROR, "database is not enabled");
    };

    match users.find_by_id(DEMO_USER_ID).await {
        Ok(Some(user)) => ApiResponse::ok(user),
        Ok(None) => ApiResponse::error(CODE_NOT_FOUND, format!("user {} not found", DEMO_USER_ID)),
        Err(e) => {
            error!("查詢使用者失敗: {}", e);
            ApiResponse::error(CODE_INTERNAL_ERROR, e.to_string())
        }
    }
}

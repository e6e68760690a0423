// api.rs - API服務模組，宣告子模組
//
// 對外提供 JSON 介面：
// - REST 服務與中間件，明文與 HTTPS 監聽
// - 統一的 `{code, message, data}` 回應格式
// - 路由與處理器

/// REST API實現
pub mod rest;
/// 連接層：HTTP/1、HTTP/2 與 TLS
pub mod listener;
/// HTTPS 證書載入
pub mod tls;
/// API路由定義
pub mod routes;
/// API處理器模組
pub mod handlers;
/// 統一回應格式
pub mod response;
/// 處理器共享狀態
pub mod state;

pub use response::ApiResponse;
pub use rest::RestApi;
pub use state::AppState;

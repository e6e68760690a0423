// server.rs - 伺服器核心組件，宣告子模組
//
// 伺服器模組負責組裝後端連接與 HTTP 服務，並管理啟停：
// - 依配置連接 MySQL 與 Redis
// - 啟動 REST 服務
// - 收到關閉訊號後停止接受請求並釋放連接池

/// 伺服器構建器實現
pub mod builder;
/// 伺服器級別錯誤處理
pub mod error;

// 重新導出核心組件，簡化外部使用
pub use crate::config::types::ServerConfig;
pub use builder::{Server, ServerBuilder};
pub use error::{ServerError, ServerResult};

/// 伺服器狀態枚舉
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServerState {
    /// 伺服器正在初始化
    Initializing,
    /// 伺服器正在運行
    Running,
    /// 伺服器正在關閉
    ShuttingDown,
    /// 伺服器已停止
    Stopped,
}

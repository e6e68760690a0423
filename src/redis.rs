//! Redis 鍵值存取
//!
//! - `pool`：基於 deadpool-redis 的連接池與 `RedisPool` 抽象
//! - `client`：`KvClient`，每個操作借出一條連接，執行後自動歸還
//! - `operations`：按資料結構分組的命令（字串、集合、有序集合、哈希、列表）
//! - `reply`：回覆解碼
//! - `test_config`：連接真實 Redis 的測試配置，單元測試與整合測試共用

pub mod client;
pub mod operations;
pub mod pool;
pub mod reply;

pub mod test_config;
#[cfg(test)]
pub mod testing;

pub use client::{KvClient, KvError};
pub use operations::pair_up;
pub use pool::{ConnectionPool, RedisPool, RedisPoolError};
pub use reply::Reply;

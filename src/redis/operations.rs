//! 鍵值操作
//!
//! 按數據結構分組的 `KvClient` 方法，每個方法對應一條 Redis 命令：
//! 字串與鍵、集合、有序集合、雜湊、列表。

pub mod hashes;
pub mod lists;
pub mod sets;
pub mod sorted_sets;
pub mod strings;

pub use hashes::pair_up;

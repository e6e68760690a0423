//! 關聯式資料庫存取（MySQL）

pub mod database;
pub mod migrations;
pub mod models;
pub mod repository;

pub use database::*;
pub use migrations::*;
pub use models::User;
pub use repository::{DbExecutor, MySqlUserRepository, StorageError, UserRepository};

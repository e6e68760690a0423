pub mod user;

pub use user::*;

use crate::storage::migrations::TableDefinition;

/// 遷移時需要建立的全部資料表
pub const ALL_TABLES: &[TableDefinition] = &[User::TABLE];

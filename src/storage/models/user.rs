use serde::{Deserialize, Serialize};

use crate::storage::migrations::TableDefinition;

/// 使用者模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

/// 使用者插入模型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInsert {
    pub name: String,
    pub age: i32,
}

impl User {
    pub const TABLE: TableDefinition = TableDefinition {
        name: "user",
        create_sql: "CREATE TABLE IF NOT EXISTS `{table}` (\
            `id` BIGINT NOT NULL AUTO_INCREMENT, \
            `name` VARCHAR(255) NOT NULL DEFAULT '', \
            `age` INT NOT NULL DEFAULT 0, \
            PRIMARY KEY (`id`)\
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
    };

    /// 帶前綴的表名
    pub fn table_name(prefix: &str) -> String {
        Self::TABLE.table_name(prefix)
    }
}

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::info;

use crate::storage::models::ALL_TABLES;

/// 表定義：名稱（不含前綴）與建表語句模板
///
/// 模板中的 `{table}` 在執行時替換為帶前綴的表名。
#[derive(Debug, Clone, Copy)]
pub struct TableDefinition {
    pub name: &'static str,
    pub create_sql: &'static str,
}

impl TableDefinition {
    /// 帶前綴的表名
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }

    /// 生成建表語句
    pub fn create_statement(&self, prefix: &str) -> String {
        self.create_sql.replace("{table}", &self.table_name(prefix))
    }
}

/// 執行數據庫遷移
///
/// 只建立缺少的表，不修改也不刪除既有欄位。
pub async fn run_migrations(pool: &MySqlPool, prefix: &str) -> Result<()> {
    info!("開始執行數據庫遷移...");

    for table in ALL_TABLES {
        sqlx::query(&table.create_statement(prefix))
            .execute(pool)
            .await
            .with_context(|| format!("建立資料表 {} 失敗", table.table_name(prefix)))?;
        info!("資料表已就緒: {}", table.table_name(prefix));
    }

    info!("數據庫遷移完成，共 {} 張表", ALL_TABLES.len());
    Ok(())
}

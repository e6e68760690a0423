use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::storage::models::user::{User, UserInsert};
use crate::storage::repository::{DbExecutor, StorageError};

/// 使用者儲存庫特徵
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 根據ID獲取使用者
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// 創建使用者，返回帶自增ID的記錄
    async fn create(&self, user: &UserInsert) -> Result<User, StorageError>;

    /// 以ID更新全部欄位
    async fn save(&self, user: &User) -> Result<User, StorageError>;

    /// 刪除使用者，返回是否有記錄被刪除
    async fn delete(&self, id: i64) -> Result<bool, StorageError>;
}

/// MySQL 使用者儲存庫實現
pub struct MySqlUserRepository {
    pool: MySqlPool,
    table: String,
}

impl MySqlUserRepository {
    /// 創建新的使用者儲存庫，`prefix` 為資料表前綴
    pub fn new(pool: MySqlPool, prefix: &str) -> Self {
        Self {
            pool,
            table: User::table_name(prefix),
        }
    }

    fn select_by_id_sql(&self) -> String {
        format!("SELECT id, name, age FROM `{}` WHERE id = ?", self.table)
    }
}

impl DbExecutor for MySqlUserRepository {
    fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&self.select_by_id_sql())
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;
        Ok(user)
    }

    async fn create(&self, user: &UserInsert) -> Result<User, StorageError> {
        let result = sqlx::query(&format!(
            "INSERT INTO `{}` (name, age) VALUES (?, ?)",
            self.table
        ))
        .bind(&user.name)
        .bind(user.age)
        .execute(self.get_pool())
        .await?;

        Ok(User {
            id: result.last_insert_id() as i64,
            name: user.name.clone(),
            age: user.age,
        })
    }

    async fn save(&self, user: &User) -> Result<User, StorageError> {
        let result = sqlx::query(&format!(
            "UPDATE `{}` SET name = ?, age = ? WHERE id = ?",
            self.table
        ))
        .bind(&user.name)
        .bind(user.age)
        .bind(user.id)
        .execute(self.get_pool())
        .await?;

        // 欄位值未變時影響行數可能為 0，再確認記錄是否存在
        if result.rows_affected() == 0 && self.find_by_id(user.id).await?.is_none() {
            return Err(StorageError::NotFound {
                entity: "使用者",
                id: user.id,
            });
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM `{}` WHERE id = ?", self.table))
            .bind(id)
            .execute(self.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

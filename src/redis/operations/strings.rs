use deadpool_redis::redis::cmd;

use crate::redis::client::{apply_ttl, execute, KvClient, KvError};
use crate::redis::pool::RedisPool;

impl<P: RedisPool> KvClient<P> {
    /// 無條件覆寫鍵值；`ttl > 0` 時重新設置絕對過期時間
    pub async fn set(&self, key: &str, value: &[u8], ttl: i64) -> Result<(), KvError> {
        self.query_with_ttl(cmd("SET").arg(key).arg(value), key, ttl)
            .await?
            .into_ok("SET")
    }

    /// 讀取鍵值，鍵不存在時返回空值
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        self.query(cmd("GET").arg(key)).await?.into_bytes("GET")
    }

    /// 批量寫入後逐鍵設置 TTL
    ///
    /// MSET 與後續的 EXPIRE 不是原子操作，中途失敗時部分鍵可能沒有 TTL。
    pub async fn mset<K, V>(&self, pairs: &[(K, V)], ttl: i64) -> Result<(), KvError>
    where
        K: AsRef<str> + Sync,
        V: AsRef<[u8]> + Sync,
    {
        if pairs.is_empty() {
            return Ok(());
        }

        let mut command = cmd("MSET");
        for (key, value) in pairs {
            command.arg(key.as_ref()).arg(value.as_ref());
        }

        let mut conn = self.pool().get_conn().await?;
        execute(&mut conn, &command).await?.into_ok("MSET")?;

        if ttl > 0 {
            for (key, _) in pairs {
                apply_ttl(&mut conn, key.as_ref(), ttl).await?;
            }
        }
        Ok(())
    }

    /// 批量讀取，返回與 `keys` 等長的結果，不存在的鍵以空值佔位
    pub async fn mget<K>(&self, keys: &[K]) -> Result<Vec<Vec<u8>>, KvError>
    where
        K: AsRef<str> + Sync,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut command = cmd("MGET");
        for key in keys {
            command.arg(key.as_ref());
        }
        self.query(&command).await?.into_bulk_list("MGET")
    }

    pub async fn exists(&self, key: &str) -> Result<bool, KvError> {
        self.query(cmd("EXISTS").arg(key)).await?.into_bool("EXISTS")
    }

    /// 刪除單個鍵，返回實際刪除的數量
    pub async fn del(&self, key: &str) -> Result<i64, KvError> {
        self.query(cmd("DEL").arg(key)).await?.into_integer("DEL")
    }

    /// 刪除多個鍵，空輸入直接成功
    pub async fn dels<K>(&self, keys: &[K]) -> Result<i64, KvError>
    where
        K: AsRef<str> + Sync,
    {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut command = cmd("DEL");
        for key in keys {
            command.arg(key.as_ref());
        }
        self.query(&command).await?.into_integer("DEL")
    }

    /// 按模式列出鍵
    ///
    /// 使用 `KEYS`，成本與整個數據集大小成正比，不適合大型部署。
    pub async fn keys(&self, pattern: &str) -> Result<Vec<Vec<u8>>, KvError> {
        self.query(cmd("KEYS").arg(pattern)).await?.into_bulk_list("KEYS")
    }
}

use deadpool_redis::redis::cmd;

use crate::redis::client::{ensure_pairs, KvClient, KvError};
use crate::redis::pool::RedisPool;

impl<P: RedisPool> KvClient<P> {
    /// 設置單個欄位，返回新建的欄位數
    pub async fn hset(&self, key: &str, ttl: i64, field: &str, value: &[u8]) -> Result<i64, KvError> {
        self.query_with_ttl(cmd("HSET").arg(key).arg(field).arg(value), key, ttl)
            .await?
            .into_integer("HSET")
    }

    /// 讀取欄位，不存在時返回空值
    pub async fn hget(&self, key: &str, field: &str) -> Result<Vec<u8>, KvError> {
        self.query(cmd("HGET").arg(key).arg(field))
            .await?
            .into_bytes("HGET")
    }

    /// 以扁平的「欄位, 值」序列批量設置
    ///
    /// 參數個數為奇數時直接返回 `KvError::OddArguments`，不發送命令。
    pub async fn hmset<A>(&self, key: &str, ttl: i64, field_values: &[A]) -> Result<(), KvError>
    where
        A: AsRef<[u8]> + Sync,
    {
        ensure_pairs("HMSET", field_values.len())?;

        let mut command = cmd("HMSET");
        command.arg(key);
        for arg in field_values {
            command.arg(arg.as_ref());
        }
        self.query_with_ttl(&command, key, ttl)
            .await?
            .into_ok("HMSET")
    }

    /// 批量讀取欄位，結果與 `fields` 等長
    pub async fn hmget<F>(&self, key: &str, fields: &[F]) -> Result<Vec<Vec<u8>>, KvError>
    where
        F: AsRef<str> + Sync,
    {
        let mut command = cmd("HMGET");
        command.arg(key);
        for field in fields {
            command.arg(field.as_ref());
        }
        self.query(&command).await?.into_bulk_list("HMGET")
    }

    /// 刪除欄位，返回實際刪除的數量
    pub async fn hdel<F>(&self, key: &str, fields: &[F]) -> Result<i64, KvError>
    where
        F: AsRef<str> + Sync,
    {
        let mut command = cmd("HDEL");
        command.arg(key);
        for field in fields {
            command.arg(field.as_ref());
        }
        self.query(&command).await?.into_integer("HDEL")
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool, KvError> {
        self.query(cmd("HEXISTS").arg(key).arg(field))
            .await?
            .into_bool("HEXISTS")
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<Vec<u8>>, KvError> {
        self.query(cmd("HKEYS").arg(key)).await?.into_bulk_list("HKEYS")
    }

    pub async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>, KvError> {
        self.query(cmd("HVALS").arg(key)).await?.into_bulk_list("HVALS")
    }

    /// 全部欄位與值，扁平交錯排列；需要成對結構時用 [`pair_up`]
    pub async fn hgetall(&self, key: &str) -> Result<Vec<Vec<u8>>, KvError> {
        self.query(cmd("HGETALL").arg(key))
            .await?
            .into_bulk_list("HGETALL")
    }

    pub async fn hlen(&self, key: &str) -> Result<i64, KvError> {
        self.query(cmd("HLEN").arg(key)).await?.into_integer("HLEN")
    }
}

/// 把扁平交錯序列重新配對，落單的最後一個元素會被丟棄
pub fn pair_up(flat: Vec<Vec<u8>>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut items = flat.into_iter();
    let mut pairs = Vec::with_capacity(items.len() / 2);
    while let (Some(first), Some(second)) = (items.next(), items.next()) {
        pairs.push((first, second));
    }
    pairs
}

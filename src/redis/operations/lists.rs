use deadpool_redis::redis::cmd;

use crate::redis::client::{KvClient, KvError};
use crate::redis::pool::RedisPool;

impl<P: RedisPool> KvClient<P> {
    /// 追加到列表尾部，返回新長度
    pub async fn rpush<V>(&self, key: &str, values: &[V]) -> Result<i64, KvError>
    where
        V: AsRef<[u8]> + Sync,
    {
        let mut command = cmd("RPUSH");
        command.arg(key);
        for value in values {
            command.arg(value.as_ref());
        }
        self.query(&command).await?.into_integer("RPUSH")
    }

    /// 插入到列表頭部，返回新長度
    ///
    /// 多個值依序插入，因此最後一個值位於最前。
    pub async fn lpush<V>(&self, key: &str, values: &[V]) -> Result<i64, KvError>
    where
        V: AsRef<[u8]> + Sync,
    {
        let mut command = cmd("LPUSH");
        command.arg(key);
        for value in values {
            command.arg(value.as_ref());
        }
        self.query(&command).await?.into_integer("LPUSH")
    }

    /// 從尾部彈出，空列表返回空值
    pub async fn rpop(&self, key: &str) -> Result<Vec<u8>, KvError> {
        self.query(cmd("RPOP").arg(key)).await?.into_bytes("RPOP")
    }

    /// 從頭部彈出，空列表返回空值
    pub async fn lpop(&self, key: &str) -> Result<Vec<u8>, KvError> {
        self.query(cmd("LPOP").arg(key)).await?.into_bytes("LPOP")
    }

    pub async fn lindex(&self, key: &str, index: i64) -> Result<Vec<u8>, KvError> {
        self.query(cmd("LINDEX").arg(key).arg(index))
            .await?
            .into_bytes("LINDEX")
    }

    pub async fn llen(&self, key: &str) -> Result<i64, KvError> {
        self.query(cmd("LLEN").arg(key)).await?.into_integer("LLEN")
    }
}

use deadpool_redis::redis::cmd;

use crate::redis::client::{KvClient, KvError};
use crate::redis::pool::RedisPool;

impl<P: RedisPool> KvClient<P> {
    /// 向集合加入成員，返回新加入的數量
    pub async fn sadd<M>(&self, key: &str, ttl: i64, members: &[M]) -> Result<i64, KvError>
    where
        M: AsRef<[u8]> + Sync,
    {
        let mut command = cmd("SADD");
        command.arg(key);
        for member in members {
            command.arg(member.as_ref());
        }
        self.query_with_ttl(&command, key, ttl)
            .await?
            .into_integer("SADD")
    }

    /// 移除集合成員，返回實際移除的數量
    pub async fn srem<M>(&self, key: &str, members: &[M]) -> Result<i64, KvError>
    where
        M: AsRef<[u8]> + Sync,
    {
        let mut command = cmd("SREM");
        command.arg(key);
        for member in members {
            command.arg(member.as_ref());
        }
        self.query(&command).await?.into_integer("SREM")
    }

    /// 鍵不存在時寫入數值，返回是否寫入
    ///
    /// 無論是否寫入，`ttl > 0` 時都會補設過期時間。
    pub async fn setnx(&self, key: &str, value: i64, ttl: i64) -> Result<bool, KvError> {
        self.query_with_ttl(cmd("SETNX").arg(key).arg(value), key, ttl)
            .await?
            .into_bool("SETNX")
    }

    pub async fn scard(&self, key: &str) -> Result<i64, KvError> {
        self.query(cmd("SCARD").arg(key)).await?.into_integer("SCARD")
    }

    pub async fn sismember(&self, key: &str, member: &[u8]) -> Result<bool, KvError> {
        self.query(cmd("SISMEMBER").arg(key).arg(member))
            .await?
            .into_bool("SISMEMBER")
    }

    /// 集合全部成員，順序不保證
    pub async fn smembers(&self, key: &str) -> Result<Vec<Vec<u8>>, KvError> {
        self.query(cmd("SMEMBERS").arg(key))
            .await?
            .into_bulk_list("SMEMBERS")
    }
}

use deadpool_redis::redis::{cmd, Cmd, ToRedisArgs};

use crate::redis::client::{ensure_pairs, KvClient, KvError};
use crate::redis::pool::RedisPool;

impl<P: RedisPool> KvClient<P> {
    /// 以扁平的「分數, 成員」序列加入有序集合，返回新加入的成員數
    ///
    /// 參數個數為奇數時直接返回 `KvError::OddArguments`，不借出連接也不發送命令。
    pub async fn zadd<A>(&self, key: &str, ttl: i64, score_members: &[A]) -> Result<i64, KvError>
    where
        A: AsRef<[u8]> + Sync,
    {
        ensure_pairs("ZADD", score_members.len())?;

        let mut command = cmd("ZADD");
        command.arg(key);
        for arg in score_members {
            command.arg(arg.as_ref());
        }
        self.query_with_ttl(&command, key, ttl)
            .await?
            .into_integer("ZADD")
    }

    /// 移除成員，返回實際移除的數量
    pub async fn zrem<M>(&self, key: &str, members: &[M]) -> Result<i64, KvError>
    where
        M: AsRef<[u8]> + Sync,
    {
        let mut command = cmd("ZREM");
        command.arg(key);
        for member in members {
            command.arg(member.as_ref());
        }
        self.query(&command).await?.into_integer("ZREM")
    }

    pub async fn zcard(&self, key: &str) -> Result<i64, KvError> {
        self.query(cmd("ZCARD").arg(key)).await?.into_integer("ZCARD")
    }

    /// 升序排名，成員不存在時為 -1
    pub async fn zrank(&self, key: &str, member: &[u8]) -> Result<i64, KvError> {
        self.query(cmd("ZRANK").arg(key).arg(member))
            .await?
            .into_rank("ZRANK")
            .map(|rank| rank.unwrap_or(-1))
    }

    /// 降序排名，成員不存在時為 -1
    pub async fn zrevrank(&self, key: &str, member: &[u8]) -> Result<i64, KvError> {
        self.query(cmd("ZREVRANK").arg(key).arg(member))
            .await?
            .into_rank("ZREVRANK")
            .map(|rank| rank.unwrap_or(-1))
    }

    /// 按排名區間 `[start, stop]` 升序讀取
    ///
    /// `with_scores` 時結果為成員與分數交錯排列。
    pub async fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        with_scores: bool,
    ) -> Result<Vec<Vec<u8>>, KvError> {
        let mut command = cmd("ZRANGE");
        command.arg(key).arg(start).arg(stop);
        with_scores_flag(&mut command, with_scores);
        self.query(&command).await?.into_bulk_list("ZRANGE")
    }

    /// 按排名區間 `[start, stop]` 降序讀取
    pub async fn zrevrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        with_scores: bool,
    ) -> Result<Vec<Vec<u8>>, KvError> {
        let mut command = cmd("ZREVRANGE");
        command.arg(key).arg(start).arg(stop);
        with_scores_flag(&mut command, with_scores);
        self.query(&command).await?.into_bulk_list("ZREVRANGE")
    }

    /// 按分數區間讀取
    ///
    /// 邊界原樣傳給服務端，可以是數值，也可以是 `"-inf"`、`"+inf"` 或 `"(5"` 這類字串。
    pub async fn zrange_by_score<Min, Max>(
        &self,
        key: &str,
        min: Min,
        max: Max,
        with_scores: bool,
    ) -> Result<Vec<Vec<u8>>, KvError>
    where
        Min: ToRedisArgs + Send + Sync,
        Max: ToRedisArgs + Send + Sync,
    {
        let mut command = cmd("ZRANGEBYSCORE");
        command.arg(key).arg(min).arg(max);
        with_scores_flag(&mut command, with_scores);
        self.query(&command).await?.into_bulk_list("ZRANGEBYSCORE")
    }

    /// 移除分數落在 `[min, max]` 的成員，返回移除數量
    pub async fn zrem_range_by_score(&self, key: &str, min: i64, max: i64) -> Result<i64, KvError> {
        self.query(cmd("ZREMRANGEBYSCORE").arg(key).arg(min).arg(max))
            .await?
            .into_integer("ZREMRANGEBYSCORE")
    }
}

fn with_scores_flag(command: &mut Cmd, with_scores: bool) {
    if with_scores {
        command.arg("WITHSCORES");
    }
}

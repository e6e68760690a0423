use deadpool_redis::redis::{aio::ConnectionLike, cmd, Arg, Cmd, RedisError, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::redis::pool::{ConnectionPool, RedisPool, RedisPoolError};
use crate::redis::reply::Reply;

/// 鍵值客戶端錯誤
///
/// 所有錯誤都直接返回給調用方，客戶端內部不重試也不記錄日誌。
#[derive(Error, Debug)]
pub enum KvError {
    /// 連接池耗盡、撥號或認證失敗
    #[error("Redis連接錯誤: {0}")]
    Pool(#[from] RedisPoolError),

    /// 服務端返回的協議錯誤
    #[error("Redis命令錯誤: {0}")]
    Redis(#[from] RedisError),

    /// 回覆形狀與命令約定不符
    #[error("{command} 回覆類型錯誤: 預期 {expected}，實際為 {found}")]
    UnexpectedReply {
        command: String,
        expected: &'static str,
        found: String,
    },

    /// 成對參數的數量為奇數，命令未發送
    #[error("{command} 的參數必須成對出現，收到 {len} 個")]
    OddArguments { command: &'static str, len: usize },
}

/// 鍵值客戶端
///
/// 每個操作從連接池借出一條連接，發送命令並解碼回覆後歸還。
/// 帶 TTL 的寫入在主命令成功後於同一連接上追加 `EXPIRE`（僅當 `ttl > 0`），
/// 兩者是獨立的往返，並非原子操作。
pub struct KvClient<P: RedisPool = Arc<ConnectionPool>> {
    pool: P,
}

impl<P: RedisPool> KvClient<P> {
    /// 以既有連接池創建客戶端
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    /// 底層連接池
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// 檢查服務端是否可用
    pub async fn ping(&self) -> Result<(), KvError> {
        self.query(&cmd("PING")).await?.into_ok("PING")
    }

    /// 設置鍵的過期時間，返回鍵是否存在
    pub async fn expire(&self, key: &str, ttl: i64) -> Result<bool, KvError> {
        self.query(cmd("EXPIRE").arg(key).arg(ttl))
            .await?
            .into_bool("EXPIRE")
    }

    /// 借出一條連接執行單一命令
    pub(crate) async fn query(&self, command: &Cmd) -> Result<Reply, KvError> {
        let mut conn = self.pool.get_conn().await?;
        execute(&mut conn, command).await
    }

    /// 執行主命令，成功後在同一連接上對 `key` 補設 TTL
    pub(crate) async fn query_with_ttl(
        &self,
        command: &Cmd,
        key: &str,
        ttl: i64,
    ) -> Result<Reply, KvError> {
        let mut conn = self.pool.get_conn().await?;
        let reply = execute(&mut conn, command).await?;
        if ttl > 0 {
            apply_ttl(&mut conn, key, ttl).await?;
        }
        Ok(reply)
    }
}

impl<P: RedisPool + Clone> Clone for KvClient<P> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// 發送命令並解碼回覆
pub(crate) async fn execute<C>(conn: &mut C, command: &Cmd) -> Result<Reply, KvError>
where
    C: ConnectionLike + Send,
{
    let value: Value = command.query_async(conn).await?;
    Reply::decode(value, &command_name(command))
}

pub(crate) async fn apply_ttl<C>(conn: &mut C, key: &str, ttl: i64) -> Result<(), KvError>
where
    C: ConnectionLike + Send,
{
    execute(conn, cmd("EXPIRE").arg(key).arg(ttl))
        .await?
        .into_integer("EXPIRE")
        .map(|_| ())
}

/// 成對參數必須為偶數個
pub(crate) fn ensure_pairs(command: &'static str, len: usize) -> Result<(), KvError> {
    if len % 2 != 0 {
        return Err(KvError::OddArguments { command, len });
    }
    Ok(())
}

fn command_name(command: &Cmd) -> String {
    match command.args_iter().next() {
        Some(Arg::Simple(name)) => String::from_utf8_lossy(name).to_uppercase(),
        _ => String::from("UNKNOWN"),
    }
}

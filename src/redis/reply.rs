//! Redis 回覆解碼
//!
//! 客戶端只接受四類回覆：nil、整數、bulk（含狀態字串）與由它們組成的陣列。
//! 其他形狀（RESP3 的 map、double 等）一律視為協議不符並返回錯誤，不會 panic。

use deadpool_redis::redis::Value;

use crate::redis::client::KvError;

/// 已解碼的 Redis 回覆
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Integer(i64),
    Bulk(Vec<u8>),
    /// 簡單狀態字串，例如 `OK`、`PONG`
    Status(String),
    Array(Vec<Reply>),
}

impl Reply {
    /// 從協議層的值解碼
    pub fn decode(value: Value, command: &str) -> Result<Self, KvError> {
        match value {
            Value::Nil => Ok(Reply::Nil),
            Value::Int(n) => Ok(Reply::Integer(n)),
            Value::BulkString(bytes) => Ok(Reply::Bulk(bytes)),
            Value::SimpleString(status) => Ok(Reply::Status(status)),
            Value::Okay => Ok(Reply::Status("OK".to_string())),
            Value::Array(items) => items
                .into_iter()
                .map(|item| Reply::decode(item, command))
                .collect::<Result<Vec<_>, _>>()
                .map(Reply::Array),
            other => Err(KvError::UnexpectedReply {
                command: command.to_string(),
                expected: "nil/integer/bulk/status/array",
                found: format!("{:?}", other),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk",
            Reply::Status(_) => "status",
            Reply::Array(_) => "array",
        }
    }

    fn mismatch(self, command: &str, expected: &'static str) -> KvError {
        KvError::UnexpectedReply {
            command: command.to_string(),
            expected,
            found: self.kind().to_string(),
        }
    }

    /// 單值讀取：nil 視為空值
    pub fn into_bytes(self, command: &str) -> Result<Vec<u8>, KvError> {
        match self {
            Reply::Nil => Ok(Vec::new()),
            Reply::Bulk(bytes) => Ok(bytes),
            other => Err(other.mismatch(command, "bulk")),
        }
    }

    /// 計數類回覆：nil 視為 0
    pub fn into_integer(self, command: &str) -> Result<i64, KvError> {
        match self {
            Reply::Nil => Ok(0),
            Reply::Integer(n) => Ok(n),
            other => Err(other.mismatch(command, "integer")),
        }
    }

    /// 排名類回覆：nil 表示成員不存在
    pub fn into_rank(self, command: &str) -> Result<Option<i64>, KvError> {
        match self {
            Reply::Nil => Ok(None),
            Reply::Integer(n) => Ok(Some(n)),
            other => Err(other.mismatch(command, "integer")),
        }
    }

    /// 0/1 旗標回覆
    pub fn into_bool(self, command: &str) -> Result<bool, KvError> {
        self.into_integer(command).map(|n| n > 0)
    }

    /// 陣列回覆：nil 元素以空值佔位，保持長度不變
    pub fn into_bulk_list(self, command: &str) -> Result<Vec<Vec<u8>>, KvError> {
        match self {
            Reply::Nil => Ok(Vec::new()),
            Reply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Nil => Ok(Vec::new()),
                    Reply::Bulk(bytes) => Ok(bytes),
                    other => Err(other.mismatch(command, "bulk")),
                })
                .collect(),
            other => Err(other.mismatch(command, "array")),
        }
    }

    /// 寫入類命令的狀態回覆
    pub fn into_ok(self, command: &str) -> Result<(), KvError> {
        match self {
            Reply::Status(_) => Ok(()),
            other => Err(other.mismatch(command, "status")),
        }
    }
}

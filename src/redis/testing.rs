//! 測試用的進程內 Redis 替身
//!
//! `InMemoryPool` 以信號量限制同時借出的連接數，並記錄峰值；
//! `InMemoryConnection` 實現 `ConnectionLike`，在內存中執行客戶端用到的命令子集。
//! 過期時間基於 `tokio::time::Instant`，配合 `start_paused` 可精確推進時鐘。

use async_trait::async_trait;
use deadpool_redis::redis::{
    aio::ConnectionLike, Arg, Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, RedisResult,
    Value,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};

use crate::redis::pool::{RedisPool, RedisPoolError};

#[derive(Default)]
struct ActiveStats {
    active: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicUsize,
}

/// 有上限的內存連接池
#[derive(Clone)]
pub struct InMemoryPool {
    max_active: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<ActiveStats>,
    store: Arc<Mutex<InMemoryStore>>,
}

impl InMemoryPool {
    pub fn new(max_active: usize) -> Self {
        Self {
            max_active,
            semaphore: Arc::new(Semaphore::new(max_active)),
            stats: Arc::new(ActiveStats::default()),
            store: Arc::new(Mutex::new(InMemoryStore::default())),
        }
    }

    /// 當前借出的連接數
    pub fn active(&self) -> usize {
        self.stats.active.load(Ordering::SeqCst)
    }

    /// 同時借出連接數的峰值
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }

    /// 累計借出次數
    pub fn acquired(&self) -> usize {
        self.stats.acquired.load(Ordering::SeqCst)
    }

    /// 讓指定命令固定返回 `reply`，用於模擬異常回覆
    pub fn script(&self, command: &str, reply: Value) {
        self.store
            .lock()
            .scripts
            .insert(command.to_uppercase(), reply);
    }

    /// 已執行的命令名稱，按執行順序
    pub fn commands(&self) -> Vec<String> {
        self.store.lock().log.clone()
    }

    /// 鍵的剩餘存活秒數，無過期時間或鍵不存在時為 `None`
    pub fn ttl(&self, key: &str) -> Option<i64> {
        let store = self.store.lock();
        let entry = store.entries.get(key.as_bytes())?;
        let now = Instant::now();
        let expires_at = entry.expires_at.filter(|at| *at > now)?;
        let remaining = expires_at - now;
        let secs = remaining.as_secs() as i64;
        Some(if remaining.subsec_nanos() > 0 { secs + 1 } else { secs })
    }
}

#[async_trait]
impl RedisPool for InMemoryPool {
    type Connection = InMemoryConnection;

    async fn get_conn(&self) -> Result<InMemoryConnection, RedisPoolError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| RedisPoolError::Closed)?;

        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        Ok(InMemoryConnection {
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            _permit: permit,
        })
    }

    fn pool_size(&self) -> u32 {
        self.max_active as u32
    }
}

/// 借出的內存連接，丟棄時歸還
pub struct InMemoryConnection {
    store: Arc<Mutex<InMemoryStore>>,
    stats: Arc<ActiveStats>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionLike for InMemoryConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        let args: Vec<Vec<u8>> = cmd
            .args_iter()
            .map(|arg| match arg {
                Arg::Simple(bytes) => bytes.to_vec(),
                Arg::Cursor => b"0".to_vec(),
            })
            .collect();
        let store = Arc::clone(&self.store);

        Box::pin(async move {
            // 讓出一次執行權，模擬網絡往返
            tokio::task::yield_now().await;
            let reply = store.lock().execute(&args);
            reply
        })
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        _cmd: &'a Pipeline,
        _offset: usize,
        _count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        Box::pin(async {
            Err(RedisError::from((
                ErrorKind::ClientError,
                "內存替身不支持管道",
            )))
        })
    }

    fn get_db(&self) -> i64 {
        0
    }
}

enum Data {
    Str(Vec<u8>),
    Set(BTreeSet<Vec<u8>>),
    /// 按 (分數, 成員) 排序
    ZSet(Vec<(f64, Vec<u8>)>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    List(VecDeque<Vec<u8>>),
}

impl Data {
    fn is_empty_collection(&self) -> bool {
        match self {
            Data::Str(_) => false,
            Data::Set(set) => set.is_empty(),
            Data::ZSet(zset) => zset.is_empty(),
            Data::Hash(hash) => hash.is_empty(),
            Data::List(list) => list.is_empty(),
        }
    }
}

struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct InMemoryStore {
    entries: HashMap<Vec<u8>, Entry>,
    scripts: HashMap<String, Value>,
    log: Vec<String>,
}

fn wrong_type() -> RedisError {
    RedisError::from((
        ErrorKind::TypeError,
        "WRONGTYPE",
        "Operation against a key holding the wrong kind of value".to_string(),
    ))
}

fn protocol_error(detail: &str) -> RedisError {
    RedisError::from((ErrorKind::ResponseError, "ERR", detail.to_string()))
}

fn parse_int(raw: &[u8]) -> RedisResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| protocol_error("value is not an integer or out of range"))
}

fn parse_score(raw: &[u8]) -> RedisResult<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| match s {
            "-inf" => Some(f64::NEG_INFINITY),
            "+inf" | "inf" => Some(f64::INFINITY),
            other => other.parse().ok(),
        })
        .ok_or_else(|| protocol_error("value is not a valid float"))
}

/// 分數邊界，`(` 前綴表示開區間
fn parse_bound(raw: &[u8]) -> RedisResult<(f64, bool)> {
    match raw.split_first() {
        Some((b'(', rest)) => Ok((parse_score(rest)?, true)),
        _ => Ok((parse_score(raw)?, false)),
    }
}

fn within(score: f64, min: (f64, bool), max: (f64, bool)) -> bool {
    let above = if min.1 { score > min.0 } else { score >= min.0 };
    let below = if max.1 { score < max.0 } else { score <= max.0 };
    above && below
}

/// 把 Redis 風格的排名區間換算成閉區間下標
fn rank_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn bulk(bytes: &[u8]) -> Value {
    Value::BulkString(bytes.to_vec())
}

fn bulk_array<'a>(items: impl IntoIterator<Item = &'a Vec<u8>>) -> Value {
    Value::Array(items.into_iter().map(|item| bulk(item)).collect())
}

fn scored_array<'a>(items: impl IntoIterator<Item = &'a (f64, Vec<u8>)>, with_scores: bool) -> Value {
    let mut out = Vec::new();
    for (score, member) in items {
        out.push(bulk(member));
        if with_scores {
            out.push(Value::BulkString(score.to_string().into_bytes()));
        }
    }
    Value::Array(out)
}

fn has_withscores(args: &[Vec<u8>]) -> bool {
    args.iter().any(|arg| arg.eq_ignore_ascii_case(b"WITHSCORES"))
}

impl InMemoryStore {
    fn execute(&mut self, args: &[Vec<u8>]) -> RedisResult<Value> {
        let name = args
            .first()
            .map(|name| String::from_utf8_lossy(name).to_uppercase())
            .unwrap_or_default();
        self.log.push(name.clone());

        if let Some(reply) = self.scripts.get(&name) {
            return Ok(reply.clone());
        }

        let now = Instant::now();
        self.entries
            .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));

        let result = self.dispatch(&name, &args[1.min(args.len())..], now);
        self.entries.retain(|_, entry| !entry.data.is_empty_collection());
        result
    }

    fn get(&self, key: &[u8]) -> Option<&Data> {
        self.entries.get(key).map(|entry| &entry.data)
    }

    fn entry_mut(&mut self, key: &[u8], init: fn() -> Data) -> &mut Data {
        &mut self
            .entries
            .entry(key.to_vec())
            .or_insert_with(|| Entry {
                data: init(),
                expires_at: None,
            })
            .data
    }

    fn put_string(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(
            key.to_vec(),
            Entry {
                data: Data::Str(value.to_vec()),
                expires_at: None,
            },
        );
    }

    fn set_mut(&mut self, key: &[u8]) -> RedisResult<&mut BTreeSet<Vec<u8>>> {
        match self.entry_mut(key, || Data::Set(BTreeSet::new())) {
            Data::Set(set) => Ok(set),
            _ => Err(wrong_type()),
        }
    }

    fn zset_mut(&mut self, key: &[u8]) -> RedisResult<&mut Vec<(f64, Vec<u8>)>> {
        match self.entry_mut(key, || Data::ZSet(Vec::new())) {
            Data::ZSet(zset) => Ok(zset),
            _ => Err(wrong_type()),
        }
    }

    fn hash_mut(&mut self, key: &[u8]) -> RedisResult<&mut BTreeMap<Vec<u8>, Vec<u8>>> {
        match self.entry_mut(key, || Data::Hash(BTreeMap::new())) {
            Data::Hash(hash) => Ok(hash),
            _ => Err(wrong_type()),
        }
    }

    fn list_mut(&mut self, key: &[u8]) -> RedisResult<&mut VecDeque<Vec<u8>>> {
        match self.entry_mut(key, || Data::List(VecDeque::new())) {
            Data::List(list) => Ok(list),
            _ => Err(wrong_type()),
        }
    }

    fn dispatch(&mut self, name: &str, args: &[Vec<u8>], now: Instant) -> RedisResult<Value> {
        let arg = |index: usize| -> RedisResult<&[u8]> {
            args.get(index)
                .map(Vec::as_slice)
                .ok_or_else(|| protocol_error("wrong number of arguments"))
        };

        match name {
            "PING" => Ok(Value::SimpleString("PONG".to_string())),

            // 字串與鍵
            "SET" => {
                self.put_string(arg(0)?, arg(1)?);
                Ok(Value::Okay)
            }
            "GET" => match self.get(arg(0)?) {
                None => Ok(Value::Nil),
                Some(Data::Str(value)) => Ok(bulk(value)),
                Some(_) => Err(wrong_type()),
            },
            "MSET" => {
                if args.is_empty() || args.len() % 2 != 0 {
                    return Err(protocol_error("wrong number of arguments for 'mset'"));
                }
                for pair in args.chunks(2) {
                    self.put_string(&pair[0], &pair[1]);
                }
                Ok(Value::Okay)
            }
            "MGET" => Ok(Value::Array(
                args.iter()
                    .map(|key| match self.get(key) {
                        Some(Data::Str(value)) => bulk(value),
                        _ => Value::Nil,
                    })
                    .collect(),
            )),
            "EXPIRE" => {
                let key = arg(0)?;
                let seconds = parse_int(arg(1)?)?;
                if !self.entries.contains_key(key) {
                    return Ok(Value::Int(0));
                }
                if seconds <= 0 {
                    self.entries.remove(key);
                } else if let Some(entry) = self.entries.get_mut(key) {
                    entry.expires_at = Some(now + Duration::from_secs(seconds as u64));
                }
                Ok(Value::Int(1))
            }
            "EXISTS" => Ok(Value::Int(
                args.iter().filter(|key| self.entries.contains_key(*key)).count() as i64,
            )),
            "DEL" => Ok(Value::Int(
                args.iter()
                    .filter(|key| self.entries.remove(*key).is_some())
                    .count() as i64,
            )),
            "KEYS" => {
                let pattern = glob::Pattern::new(&String::from_utf8_lossy(arg(0)?))
                    .map_err(|e| protocol_error(&e.to_string()))?;
                let mut keys: Vec<&Vec<u8>> = self
                    .entries
                    .keys()
                    .filter(|key| pattern.matches(&String::from_utf8_lossy(key)))
                    .collect();
                keys.sort();
                Ok(bulk_array(keys))
            }

            // 集合
            "SADD" => {
                let set = self.set_mut(arg(0)?)?;
                let added = args[1..].iter().filter(|m| set.insert(m.to_vec())).count();
                Ok(Value::Int(added as i64))
            }
            "SREM" => {
                let set = self.set_mut(arg(0)?)?;
                let removed = args[1..].iter().filter(|m| set.remove(*m)).count();
                Ok(Value::Int(removed as i64))
            }
            "SETNX" => {
                let key = arg(0)?;
                let value = arg(1)?;
                if self.entries.contains_key(key) {
                    return Ok(Value::Int(0));
                }
                self.put_string(key, value);
                Ok(Value::Int(1))
            }
            "SCARD" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::Set(set)) => Ok(Value::Int(set.len() as i64)),
                Some(_) => Err(wrong_type()),
            },
            "SISMEMBER" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::Set(set)) => Ok(Value::Int(set.contains(arg(1)?) as i64)),
                Some(_) => Err(wrong_type()),
            },
            "SMEMBERS" => match self.get(arg(0)?) {
                None => Ok(Value::Array(Vec::new())),
                Some(Data::Set(set)) => Ok(bulk_array(set)),
                Some(_) => Err(wrong_type()),
            },

            // 有序集合
            "ZADD" => {
                let pairs = &args[1.min(args.len())..];
                if pairs.is_empty() || pairs.len() % 2 != 0 {
                    return Err(protocol_error("syntax error"));
                }
                let parsed = pairs
                    .chunks(2)
                    .map(|pair| -> RedisResult<(f64, Vec<u8>)> {
                        Ok((parse_score(&pair[0])?, pair[1].clone()))
                    })
                    .collect::<RedisResult<Vec<_>>>()?;

                let zset = self.zset_mut(arg(0)?)?;
                let mut added = 0;
                for (score, member) in parsed {
                    match zset.iter_mut().find(|(_, m)| *m == member) {
                        Some(existing) => existing.0 = score,
                        None => {
                            zset.push((score, member));
                            added += 1;
                        }
                    }
                }
                zset.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
                Ok(Value::Int(added))
            }
            "ZREM" => {
                let zset = self.zset_mut(arg(0)?)?;
                let before = zset.len();
                zset.retain(|(_, member)| !args[1..].contains(member));
                Ok(Value::Int((before - zset.len()) as i64))
            }
            "ZCARD" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::ZSet(zset)) => Ok(Value::Int(zset.len() as i64)),
                Some(_) => Err(wrong_type()),
            },
            "ZRANK" | "ZREVRANK" => match self.get(arg(0)?) {
                None => Ok(Value::Nil),
                Some(Data::ZSet(zset)) => {
                    let member = arg(1)?;
                    Ok(zset
                        .iter()
                        .position(|(_, m)| m == member)
                        .map(|pos| {
                            let rank = if name == "ZRANK" { pos } else { zset.len() - 1 - pos };
                            Value::Int(rank as i64)
                        })
                        .unwrap_or(Value::Nil))
                }
                Some(_) => Err(wrong_type()),
            },
            "ZRANGE" | "ZREVRANGE" => {
                let start = parse_int(arg(1)?)?;
                let stop = parse_int(arg(2)?)?;
                let with_scores = has_withscores(&args[3.min(args.len())..]);
                match self.get(arg(0)?) {
                    None => Ok(Value::Array(Vec::new())),
                    Some(Data::ZSet(zset)) => {
                        let mut ordered: Vec<&(f64, Vec<u8>)> = zset.iter().collect();
                        if name == "ZREVRANGE" {
                            ordered.reverse();
                        }
                        Ok(match rank_range(ordered.len(), start, stop) {
                            Some((from, to)) => {
                                scored_array(ordered[from..=to].iter().copied(), with_scores)
                            }
                            None => Value::Array(Vec::new()),
                        })
                    }
                    Some(_) => Err(wrong_type()),
                }
            }
            "ZRANGEBYSCORE" => {
                let min = parse_bound(arg(1)?)?;
                let max = parse_bound(arg(2)?)?;
                let with_scores = has_withscores(&args[3.min(args.len())..]);
                match self.get(arg(0)?) {
                    None => Ok(Value::Array(Vec::new())),
                    Some(Data::ZSet(zset)) => Ok(scored_array(
                        zset.iter().filter(|(score, _)| within(*score, min, max)),
                        with_scores,
                    )),
                    Some(_) => Err(wrong_type()),
                }
            }
            "ZREMRANGEBYSCORE" => {
                let min = parse_bound(arg(1)?)?;
                let max = parse_bound(arg(2)?)?;
                let zset = self.zset_mut(arg(0)?)?;
                let before = zset.len();
                zset.retain(|(score, _)| !within(*score, min, max));
                Ok(Value::Int((before - zset.len()) as i64))
            }

            // 哈希
            "HSET" => {
                let pairs = &args[1.min(args.len())..];
                if pairs.is_empty() || pairs.len() % 2 != 0 {
                    return Err(protocol_error("wrong number of arguments for 'hset'"));
                }
                let hash = self.hash_mut(arg(0)?)?;
                let created = pairs
                    .chunks(2)
                    .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                    .count();
                Ok(Value::Int(created as i64))
            }
            "HMSET" => {
                let pairs = &args[1.min(args.len())..];
                if pairs.is_empty() || pairs.len() % 2 != 0 {
                    return Err(protocol_error("wrong number of arguments for 'hmset'"));
                }
                let hash = self.hash_mut(arg(0)?)?;
                for pair in pairs.chunks(2) {
                    hash.insert(pair[0].clone(), pair[1].clone());
                }
                Ok(Value::Okay)
            }
            "HGET" => match self.get(arg(0)?) {
                None => Ok(Value::Nil),
                Some(Data::Hash(hash)) => Ok(hash.get(arg(1)?).map_or(Value::Nil, |v| bulk(v))),
                Some(_) => Err(wrong_type()),
            },
            "HMGET" => {
                let fields = &args[1.min(args.len())..];
                match self.get(arg(0)?) {
                    None => Ok(Value::Array(vec![Value::Nil; fields.len()])),
                    Some(Data::Hash(hash)) => Ok(Value::Array(
                        fields
                            .iter()
                            .map(|field| hash.get(field).map_or(Value::Nil, |v| bulk(v)))
                            .collect(),
                    )),
                    Some(_) => Err(wrong_type()),
                }
            }
            "HDEL" => {
                let hash = self.hash_mut(arg(0)?)?;
                let removed = args[1..].iter().filter(|f| hash.remove(*f).is_some()).count();
                Ok(Value::Int(removed as i64))
            }
            "HEXISTS" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::Hash(hash)) => Ok(Value::Int(hash.contains_key(arg(1)?) as i64)),
                Some(_) => Err(wrong_type()),
            },
            "HKEYS" | "HVALS" | "HGETALL" => match self.get(arg(0)?) {
                None => Ok(Value::Array(Vec::new())),
                Some(Data::Hash(hash)) => Ok(Value::Array(match name {
                    "HKEYS" => hash.keys().map(|k| bulk(k)).collect(),
                    "HVALS" => hash.values().map(|v| bulk(v)).collect(),
                    _ => hash.iter().flat_map(|(k, v)| [bulk(k), bulk(v)]).collect(),
                })),
                Some(_) => Err(wrong_type()),
            },
            "HLEN" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::Hash(hash)) => Ok(Value::Int(hash.len() as i64)),
                Some(_) => Err(wrong_type()),
            },

            // 列表
            "LPUSH" | "RPUSH" => {
                let values = &args[1.min(args.len())..];
                if values.is_empty() {
                    return Err(protocol_error("wrong number of arguments for push"));
                }
                let list = self.list_mut(arg(0)?)?;
                for value in values {
                    if name == "LPUSH" {
                        list.push_front(value.clone());
                    } else {
                        list.push_back(value.clone());
                    }
                }
                Ok(Value::Int(list.len() as i64))
            }
            "LPOP" | "RPOP" => {
                let key = arg(0)?;
                if !self.entries.contains_key(key) {
                    return Ok(Value::Nil);
                }
                let list = self.list_mut(key)?;
                let popped = if name == "LPOP" { list.pop_front() } else { list.pop_back() };
                Ok(popped.map_or(Value::Nil, Value::BulkString))
            }
            "LINDEX" => {
                let index = parse_int(arg(1)?)?;
                match self.get(arg(0)?) {
                    None => Ok(Value::Nil),
                    Some(Data::List(list)) => {
                        let len = list.len() as i64;
                        let index = if index < 0 { len + index } else { index };
                        Ok((0..len)
                            .contains(&index)
                            .then(|| list.get(index as usize))
                            .flatten()
                            .map_or(Value::Nil, |v| bulk(v)))
                    }
                    Some(_) => Err(wrong_type()),
                }
            }
            "LLEN" => match self.get(arg(0)?) {
                None => Ok(Value::Int(0)),
                Some(Data::List(list)) => Ok(Value::Int(list.len() as i64)),
                Some(_) => Err(wrong_type()),
            },

            other => Err(protocol_error(&format!("unknown command '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_range() {
        assert_eq!(rank_range(3, 0, -1), Some((0, 2)));
        assert_eq!(rank_range(3, -2, -1), Some((1, 2)));
        assert_eq!(rank_range(3, 1, 100), Some((1, 2)));
        assert_eq!(rank_range(3, 5, 10), None);
        assert_eq!(rank_range(0, 0, -1), None);
    }

    #[test]
    fn test_score_bounds() {
        assert!(within(5.0, parse_bound(b"-inf").unwrap(), parse_bound(b"+inf").unwrap()));
        assert!(!within(5.0, parse_bound(b"(5").unwrap(), parse_bound(b"10").unwrap()));
        assert!(within(5.0, parse_bound(b"5").unwrap(), parse_bound(b"5").unwrap()));
    }

    #[tokio::test]
    async fn test_permits_bound_active_connections() {
        let pool = InMemoryPool::new(2);
        let first = pool.get_conn().await.expect("無法獲取連接");
        let _second = pool.get_conn().await.expect("無法獲取連接");
        assert_eq!(pool.active(), 2);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), pool.get_conn())
                .await
                .is_err()
        );

        drop(first);
        assert_eq!(pool.active(), 1);
        let _third = pool.get_conn().await.expect("無法獲取連接");
        assert_eq!(pool.peak(), 2);
        assert_eq!(pool.acquired(), 3);
    }
}

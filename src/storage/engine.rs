//! Thread-Safe Storage Engine
//!
//! This module implements the in-memory store behind bnkv.
//! It holds two kinds of values: plain strings and hash containers
//! (field → value maps, like Redis hashes).
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, we use multiple shards to reduce contention.
//! 2. **One Map Per Shard**: Strings and hashes share a keyspace, so a key has exactly one type.
//! 3. **Write-Locked Updates**: `update` holds the shard's write lock across read, compute and write.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards by hashing the top-level key, so all
//! fields of a hash live in the same shard.

use super::client::{KeyRef, StoreClient, StoreError};
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of shards for the storage engine.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 64;

/// Largest value the store accepts, matching the RESP bulk string limit.
pub const MAX_VALUE_SIZE: usize = 512 * 1024 * 1024;

type ShardMap = HashMap<Bytes, Value>;

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A plain string
    String(Bytes),
    /// A hash container
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    /// The name reported by `TYPE`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Hash(_) => "hash",
        }
    }
}

#[derive(Debug)]
struct Shard {
    data: RwLock<ShardMap>,
}

impl Shard {
    fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ShardMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The in-memory store.
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all client handler tasks. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use bnkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("Ariz")).unwrap();
/// assert_eq!(engine.get(b"name").unwrap(), Some(Bytes::from("Ariz")));
///
/// engine.hset(Bytes::from("wallet"), Bytes::from("usd"), Bytes::from("10.5")).unwrap();
/// assert_eq!(engine.hget(b"wallet", b"usd").unwrap(), Some(Bytes::from("10.5")));
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Number of top-level keys
    key_count: AtomicU64,

    /// Total read operations
    read_count: AtomicU64,

    /// Total write operations
    write_count: AtomicU64,

    /// Total deleted keys
    del_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::new()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Gets the string stored at `key`.
    ///
    /// Fails with `WrongType` if the key holds a hash.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let data = self.get_shard(key).read();
        Ok(read_slot(&data, &KeyRef::Flat(key))?.cloned())
    }

    /// Sets a string value, replacing whatever the key held before.
    ///
    /// Returns `true` if a new key was created.
    pub fn set(&self, key: Bytes, value: Bytes) -> Result<bool, StoreError> {
        check_size(&value)?;
        self.write_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(&key).write();
        let is_new = data.insert(key, Value::String(value)).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(is_new)
    }

    /// Deletes a key of any type. Returns `true` if it existed.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut data = self.get_shard(key).write();
        let removed = data.remove(key).is_some();
        if removed {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.del_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Deletes several keys, returning how many existed.
    pub fn delete_many(&self, keys: &[Bytes]) -> u64 {
        keys.iter().filter(|key| self.delete(key)).count() as u64
    }

    /// Returns `true` if the key exists, whatever its type.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.get_shard(key).read().contains_key(key)
    }

    /// Counts how many of the given keys exist. Repeated keys count repeatedly.
    pub fn exists_many(&self, keys: &[Bytes]) -> u64 {
        keys.iter().filter(|key| self.exists(key)).count() as u64
    }

    /// Gets a field of a hash container.
    pub fn hget(&self, container: &[u8], field: &[u8]) -> Result<Option<Bytes>, StoreError> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let data = self.get_shard(container).read();
        Ok(read_slot(&data, &KeyRef::field(container, field))?.cloned())
    }

    /// Sets a field of a hash container, creating the container if needed.
    ///
    /// Returns `true` if the field is new.
    pub fn hset(&self, container: Bytes, field: Bytes, value: Bytes) -> Result<bool, StoreError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut data = self.get_shard(&container).write();
        self.write_slot(&mut data, &KeyRef::field(&container, &field), value)
    }

    /// Removes fields from a hash container, returning how many existed.
    ///
    /// The container is deleted once its last field is removed.
    pub fn hdel(&self, container: &[u8], fields: &[Bytes]) -> Result<u64, StoreError> {
        let mut data = self.get_shard(container).write();

        let Some(value) = data.get_mut(container) else {
            return Ok(0);
        };
        let Value::Hash(hash) = value else {
            return Err(StoreError::WrongType);
        };

        let removed = fields.iter().filter(|field| hash.remove(*field).is_some()).count();
        if hash.is_empty() {
            data.remove(container);
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.del_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed as u64)
    }

    /// Returns every field and value of a hash container, sorted by field.
    pub fn hgetall(&self, container: &[u8]) -> Result<Vec<(Bytes, Bytes)>, StoreError> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let data = self.get_shard(container).read();
        match data.get(container) {
            None => Ok(Vec::new()),
            Some(Value::String(_)) => Err(StoreError::WrongType),
            Some(Value::Hash(hash)) => {
                let mut pairs: Vec<_> = hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                pairs.sort();
                Ok(pairs)
            }
        }
    }

    /// Number of fields in a hash container.
    pub fn hlen(&self, container: &[u8]) -> Result<usize, StoreError> {
        let data = self.get_shard(container).read();
        match data.get(container) {
            None => Ok(0),
            Some(Value::String(_)) => Err(StoreError::WrongType),
            Some(Value::Hash(hash)) => Ok(hash.len()),
        }
    }

    /// Returns the type of a key ("string", "hash", or "none").
    pub fn key_type(&self, key: &[u8]) -> &'static str {
        self.get_shard(key)
            .read()
            .get(key)
            .map_or("none", Value::type_name)
    }

    /// Removes every key.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
        self.key_count.store(0, Ordering::Relaxed);
    }

    /// Number of top-level keys.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            read_ops: self.read_count.load(Ordering::Relaxed),
            write_ops: self.write_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
        }
    }

    /// Writes `value` at `key` into an already locked shard.
    ///
    /// Returns `true` if the value did not exist before.
    fn write_slot(&self, data: &mut ShardMap, key: &KeyRef<'_>, value: Bytes) -> Result<bool, StoreError> {
        check_size(&value)?;

        match *key {
            KeyRef::Flat(key) => {
                let is_new = data
                    .insert(Bytes::copy_from_slice(key), Value::String(value))
                    .is_none();
                if is_new {
                    self.key_count.fetch_add(1, Ordering::Relaxed);
                }
                Ok(is_new)
            }
            KeyRef::Field { container, field } => {
                if !data.contains_key(container) {
                    data.insert(Bytes::copy_from_slice(container), Value::Hash(HashMap::new()));
                    self.key_count.fetch_add(1, Ordering::Relaxed);
                }
                match data.get_mut(container) {
                    Some(Value::Hash(hash)) => Ok(hash
                        .insert(Bytes::copy_from_slice(field), value)
                        .is_none()),
                    _ => Err(StoreError::WrongType),
                }
            }
        }
    }
}

/// Reads the value at `key` from an already locked shard.
fn read_slot<'m>(data: &'m ShardMap, key: &KeyRef<'_>) -> Result<Option<&'m Bytes>, StoreError> {
    match *key {
        KeyRef::Flat(key) => match data.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(Value::Hash(_)) => Err(StoreError::WrongType),
        },
        KeyRef::Field { container, field } => match data.get(container) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field)),
            Some(Value::String(_)) => Err(StoreError::WrongType),
        },
    }
}

fn check_size(value: &Bytes) -> Result<(), StoreError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(StoreError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

impl StoreClient for StorageEngine {
    fn get(&self, key: &KeyRef<'_>) -> Result<Option<Bytes>, StoreError> {
        match *key {
            KeyRef::Flat(key) => StorageEngine::get(self, key),
            KeyRef::Field { container, field } => self.hget(container, field),
        }
    }

    fn set(&self, key: &KeyRef<'_>, value: Bytes) -> Result<(), StoreError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut data = self.get_shard(key.routing_key()).write();
        self.write_slot(&mut data, key, value).map(|_| ())
    }

    fn update<T, E, F>(&self, key: &KeyRef<'_>, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Option<&Bytes>) -> Result<(Bytes, T), E>,
    {
        // The write guard lives until the new value is in place.
        let mut data = self.get_shard(key.routing_key()).write();

        self.read_count.fetch_add(1, Ordering::Relaxed);
        let current = read_slot(&data, key)?.cloned();
        let (value, output) = f(current.as_ref())?;

        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.write_slot(&mut data, key, value)?;
        Ok(output)
    }
}

/// Statistics about the storage engine.
#[derive(Debug, Clone, Copy)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total read operations
    pub read_ops: u64,
    /// Total write operations
    pub write_ops: u64,
    /// Total deleted keys
    pub del_ops: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        assert_eq!(engine.set(Bytes::from("key"), Bytes::from("value")), Ok(true));
        assert_eq!(engine.get(b"key"), Ok(Some(Bytes::from("value"))));
        assert_eq!(engine.set(Bytes::from("key"), Bytes::from("other")), Ok(false));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(b"nonexistent"), Ok(None));
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("key"), Bytes::from("value")).unwrap();
        assert!(engine.delete(b"key"));
        assert_eq!(engine.get(b"key"), Ok(None));
        assert!(!engine.delete(b"key")); // Already deleted
        assert!(engine.is_empty());
    }

    #[test]
    fn test_exists_many() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("a"), Bytes::from("1")).unwrap();
        engine.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("1")).unwrap();
        let keys = [Bytes::from("a"), Bytes::from("h"), Bytes::from("a"), Bytes::from("x")];
        assert_eq!(engine.exists_many(&keys), 3);
        assert_eq!(engine.delete_many(&keys), 2);
    }

    #[test]
    fn test_hash_fields() {
        let engine = StorageEngine::new();

        assert_eq!(engine.hset(Bytes::from("h"), Bytes::from("a"), Bytes::from("1")), Ok(true));
        assert_eq!(engine.hset(Bytes::from("h"), Bytes::from("b"), Bytes::from("2")), Ok(true));
        assert_eq!(engine.hset(Bytes::from("h"), Bytes::from("a"), Bytes::from("3")), Ok(false));

        assert_eq!(engine.hget(b"h", b"a"), Ok(Some(Bytes::from("3"))));
        assert_eq!(engine.hget(b"h", b"missing"), Ok(None));
        assert_eq!(engine.hget(b"nohash", b"a"), Ok(None));
        assert_eq!(engine.hlen(b"h"), Ok(2));
        assert_eq!(engine.len(), 1);
        assert_eq!(
            engine.hgetall(b"h"),
            Ok(vec![
                (Bytes::from("a"), Bytes::from("3")),
                (Bytes::from("b"), Bytes::from("2")),
            ])
        );
    }

    #[test]
    fn test_hdel_removes_empty_container() {
        let engine = StorageEngine::new();

        engine.hset(Bytes::from("h"), Bytes::from("a"), Bytes::from("1")).unwrap();
        engine.hset(Bytes::from("h"), Bytes::from("b"), Bytes::from("2")).unwrap();

        assert_eq!(engine.hdel(b"h", &[Bytes::from("a"), Bytes::from("zz")]), Ok(1));
        assert!(engine.exists(b"h"));
        assert_eq!(engine.hdel(b"h", &[Bytes::from("b")]), Ok(1));
        assert!(!engine.exists(b"h"));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_wrong_type() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("s"), Bytes::from("1")).unwrap();
        engine.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("1")).unwrap();

        assert_eq!(engine.get(b"h"), Err(StoreError::WrongType));
        assert_eq!(engine.hget(b"s", b"f"), Err(StoreError::WrongType));
        assert_eq!(
            engine.hset(Bytes::from("s"), Bytes::from("f"), Bytes::from("1")),
            Err(StoreError::WrongType)
        );
        assert_eq!(engine.hgetall(b"s"), Err(StoreError::WrongType));
        assert_eq!(engine.hdel(b"s", &[Bytes::from("f")]), Err(StoreError::WrongType));

        // SET replaces a value of any type
        assert_eq!(engine.set(Bytes::from("h"), Bytes::from("2")), Ok(false));
        assert_eq!(engine.key_type(b"h"), "string");
    }

    #[test]
    fn test_key_type() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("s"), Bytes::from("1")).unwrap();
        engine.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("1")).unwrap();

        assert_eq!(engine.key_type(b"s"), "string");
        assert_eq!(engine.key_type(b"h"), "hash");
        assert_eq!(engine.key_type(b"none"), "none");
    }

    #[test]
    fn test_flush() {
        let engine = StorageEngine::new();

        for i in 0..100 {
            engine.set(Bytes::from(format!("key{}", i)), Bytes::from("v")).unwrap();
        }
        assert_eq!(engine.len(), 100);

        engine.flush();
        assert!(engine.is_empty());
        assert_eq!(engine.get(b"key0"), Ok(None));
    }

    #[test]
    fn test_client_update_writes_result() {
        let engine = StorageEngine::new();
        let key = KeyRef::field(b"h", b"count");

        let seen: Result<Option<Bytes>, StoreError> = engine.update(&key, |current| {
            Ok((Bytes::from("1"), current.cloned()))
        });
        assert_eq!(seen, Ok(None));
        assert_eq!(StoreClient::get(&engine, &key), Ok(Some(Bytes::from("1"))));
    }

    #[test]
    fn test_client_update_failure_writes_nothing() {
        let engine = StorageEngine::new();
        let key = KeyRef::flat(b"k");

        let result: Result<(), StoreError> =
            engine.update(&key, |_| Err(StoreError::Unavailable("boom".into())));
        assert!(result.is_err());
        assert!(!engine.exists(b"k"));
    }

    #[test]
    fn test_concurrent_updates_compose() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let result: Result<(), StoreError> = engine.update(&KeyRef::flat(b"n"), |current| {
                        let n: u64 = current
                            .map(|v| std::str::from_utf8(v).unwrap().parse().unwrap())
                            .unwrap_or(0);
                        Ok((Bytes::from((n + 1).to_string()), ()))
                    });
                    result.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(StorageEngine::get(&engine, b"n"), Ok(Some(Bytes::from("800"))));
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("a"), Bytes::from("1")).unwrap();
        engine.get(b"a").unwrap();
        engine.delete(b"a");

        let stats = engine.stats();
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.read_ops, 1);
        assert_eq!(stats.write_ops, 1);
        assert_eq!(stats.del_ops, 1);
    }
}

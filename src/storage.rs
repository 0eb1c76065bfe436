//! Durable object storage
//!
//! Key-based get/put/list/exists over a hierarchical namespace. The
//! production backend is embedded RocksDB (no external database); an
//! in-memory implementation backs unit tests.

use anyhow::Result;
use parking_lot::RwLock;
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::collections::BTreeMap;
use std::path::Path;

/// Key-based durable storage over a hierarchical namespace
pub trait ObjectStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any existing value
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// List all keys starting with `prefix`, in lexicographic order
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check whether `key` exists
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// RocksDB-backed object store
pub struct RocksObjectStore {
    db: DB,
}

impl RocksObjectStore {
    /// Open (or create) a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }
}

impl ObjectStore for RocksObjectStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, _) = item?;
            match std::str::from_utf8(&key) {
                Ok(key) if key.starts_with(prefix) => keys.push(key.to_string()),
                // Keys are sorted, so the first non-matching key ends the scan
                _ => break,
            }
        }

        Ok(keys)
    }
}

/// In-memory object store for tests and ephemeral pipelines
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.objects.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

// Database - Key/value persistence behind a small trait
// RocksDB on disk for the node, an in-memory map for tests and dry runs

use rocksdb::{Options, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Ordered key/value store with atomic batches
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError>;

    fn delete(&self, key: &[u8]) -> Result<(), DatabaseError>;

    /// Applies every op or none of them
    fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError>;

    fn exists(&self, key: &[u8]) -> Result<bool, DatabaseError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Write operation for a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Wrapper around RocksDB
pub struct Database {
    db: Arc<DB>,
}

impl Database {
    /// Opens or creates a database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Keep the file count low; the parameter subspace is tiny
        opts.set_keep_log_file_num(5);
        opts.set_max_manifest_file_size(64 * 1024 * 1024);
        opts.set_max_background_jobs(2);
        opts.set_recycle_log_file_num(2);

        let db = DB::open(&opts, path).map_err(|e| DatabaseError::OpenFailed(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for Database {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.db
            .get(key)
            .map_err(|e| DatabaseError::ReadFailed(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        self.db
            .put(key, value)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), DatabaseError> {
        self.db
            .delete(key)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()))
    }

    fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let mut batch = rocksdb::WriteBatch::default();

        for op in ops {
            match op {
                WriteOp::Put { key, value } => batch.put(&key, &value),
                WriteOp::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
        let mut out = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item.map_err(|e| DatabaseError::ReadFailed(e.to_string()))?;
            // No prefix extractor is configured: the iterator only seeks, so stop past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> DatabaseError {
    DatabaseError::ReadFailed("memory store lock poisoned".to_string())
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), DatabaseError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        // One guard for the whole batch: readers never see it half applied
        let mut entries = self.entries.write().map_err(poisoned)?;
        for op in ops {
            match op {
                WriteOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise_basic_ops(db: &dyn KvStore) {
        // Put
        db.put(b"key1", b"value1").unwrap();

        // Get
        let value = db.get(b"key1").unwrap();
        assert_eq!(value, Some(b"value1".to_vec()));

        // Exists
        assert!(db.exists(b"key1").unwrap());
        assert!(!db.exists(b"key2").unwrap());

        // Delete
        db.delete(b"key1").unwrap();
        assert!(!db.exists(b"key1").unwrap());
    }

    fn exercise_batch_and_scan(db: &dyn KvStore) {
        let ops = vec![
            WriteOp::Put {
                key: b"gov/b".to_vec(),
                value: b"2".to_vec(),
            },
            WriteOp::Put {
                key: b"gov/a".to_vec(),
                value: b"1".to_vec(),
            },
            WriteOp::Put {
                key: b"other".to_vec(),
                value: b"x".to_vec(),
            },
        ];
        db.batch_write(ops).unwrap();

        let scanned = db.scan_prefix(b"gov/").unwrap();
        assert_eq!(
            scanned,
            vec![
                (b"gov/a".to_vec(), b"1".to_vec()),
                (b"gov/b".to_vec(), b"2".to_vec()),
            ]
        );

        db.batch_write(vec![WriteOp::Delete { key: b"gov/a".to_vec() }])
            .unwrap();
        assert_eq!(db.scan_prefix(b"gov/").unwrap().len(), 1);
        assert!(db.scan_prefix(b"none/").unwrap().is_empty());
    }

    #[test]
    fn test_database_basic_ops() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();
        exercise_basic_ops(&db);
    }

    #[test]
    fn test_database_batch() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();
        exercise_batch_and_scan(&db);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise_basic_ops(&store);
        exercise_batch_and_scan(&store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_database_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        {
            let db = Database::open(temp_dir.path()).unwrap();
            db.put(b"k", b"v").unwrap();
        }
        let db = Database::open(temp_dir.path()).unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}

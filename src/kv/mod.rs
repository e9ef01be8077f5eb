//! Key-value persistence backends.
//!
//! The plant store only needs two calls from its backend: read a string by
//! key and replace the string under a key. Anything durable that can do that
//! can sit behind [`KeyValueStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::Database;

/// Key-value backend errors.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("failed to read key {key}")]
    Read {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write key {key}")]
    Write {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` if nothing was ever written.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replaces the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// Process-local backend. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let values = self.values.lock().expect("kv lock poisoned");
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut values = self.values.lock().expect("kv lock poisoned");
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Backend storing each key as one row of the `kv` table.
#[derive(Clone)]
pub struct SqliteKv {
    db: Database,
}

impl SqliteKv {
    /// Wraps an already migrated database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.db.get_value(key).map_err(|source| KvError::Read {
            key: key.to_string(),
            source,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.db.set_value(key, value).map_err(|source| KvError::Write {
            key: key.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_kv_round_trip() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("k").await.unwrap(), None);

        kv.set("k", "{}").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_sqlite_kv_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plants.db");

        {
            let db = Database::open(path.clone()).unwrap();
            db.migrate().unwrap();
            SqliteKv::new(db).set("k", "v").await.unwrap();
        }

        let db = Database::open(path).unwrap();
        db.migrate().unwrap();
        assert_eq!(SqliteKv::new(db).get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_sqlite_kv_without_migrations_fails_to_read() {
        let kv = SqliteKv::new(Database::open_memory().unwrap());
        let err = kv.get("k").await.unwrap_err();
        assert!(matches!(err, KvError::Read { .. }));

        let cause = std::error::Error::source(&err).expect("cause attached");
        assert!(cause.to_string().contains("no such table"));
    }
}

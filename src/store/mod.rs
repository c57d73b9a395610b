//! Key-value configuration store.
//!
//! The core never owns the storage format: it reads and writes typed values
//! under string keys and supplies its own defaults on a miss.

mod migrations;
pub mod sqlite;

use std::{
    collections::{BTreeSet, HashMap},
    sync::RwLock,
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::utils::logging::STORE;

pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum StoreValue {
    Str(String),
    Int(i64),
    Bool(bool),
    StrSet(BTreeSet<String>),
}

impl StoreValue {
    fn kind(&self) -> &'static str {
        match self {
            StoreValue::Str(_) => "string",
            StoreValue::Int(_) => "integer",
            StoreValue::Bool(_) => "boolean",
            StoreValue::StrSet(_) => "string set",
        }
    }
}

/// Typed get/set over a key-value backend.
///
/// Backends implement `get`, `put`, `remove` and `keys_with_prefix`; the typed
/// accessors resolve misses and type mismatches to the caller's default.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoreValue>>;

    fn put(&self, key: &str, value: StoreValue) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    fn get_string(&self, key: &str, default: &str) -> Result<String> {
        Ok(match self.get(key)? {
            Some(StoreValue::Str(value)) => value,
            other => fallback(key, other, default.to_string()),
        })
    }

    fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        Ok(match self.get(key)? {
            Some(StoreValue::Int(value)) => value,
            other => fallback(key, other, default),
        })
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get(key)? {
            Some(StoreValue::Bool(value)) => value,
            other => fallback(key, other, default),
        })
    }

    fn get_string_set(&self, key: &str) -> Result<BTreeSet<String>> {
        Ok(match self.get(key)? {
            Some(StoreValue::StrSet(value)) => value,
            other => fallback(key, other, BTreeSet::new()),
        })
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, StoreValue::Str(value.to_string()))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, StoreValue::Int(value))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, StoreValue::Bool(value))
    }

    fn set_string_set(&self, key: &str, value: BTreeSet<String>) -> Result<()> {
        self.put(key, StoreValue::StrSet(value))
    }
}

fn fallback<T>(key: &str, found: Option<StoreValue>, default: T) -> T {
    if let Some(value) = found {
        log::warn!(
            target: STORE,
            "key {key} holds a {} value; using default",
            value.kind()
        );
    }
    default
}

/// Process-local store. Used by tests and by hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, StoreValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: &str, value: StoreValue) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        guard.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        let mut keys: Vec<String> = guard
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

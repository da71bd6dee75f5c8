//! 本地键值存储
//!
//! 提供带命名空间前缀的 get/set/remove 接口，内存实现与 JSON 文件实现

mod file_store;

pub use file_store::FileStore;

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// 所有键共享的命名空间前缀
pub const STORAGE_PREFIX: &str = "bookkeeping_";

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// 键值存储接口
///
/// 调用方传入不带前缀的键，实现负责加上 [`STORAGE_PREFIX`]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// 清除本应用写入的所有键
    fn clear(&self) -> Result<(), StorageError>;
}

pub(crate) fn prefixed(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的键数量（含前缀）
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(&prefixed(key)).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(prefixed(key), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(&prefixed(key));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries
            .write()
            .retain(|k, _| !k.starts_with(STORAGE_PREFIX));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("last_update_check").is_none());

        store.set("last_update_check", "1700000000000").unwrap();
        assert_eq!(
            store.get("last_update_check").as_deref(),
            Some("1700000000000")
        );

        store.remove("last_update_check").unwrap();
        assert!(store.get("last_update_check").is_none());
    }

    #[test]
    fn test_memory_store_keys_are_prefixed() {
        let store = MemoryStore::new();
        store.set("user", "alice").unwrap();
        let entries = store.entries.read();
        assert!(entries.contains_key("bookkeeping_user"));
    }

    #[test]
    fn test_memory_store_clear_only_touches_prefixed_keys() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store
            .entries
            .write()
            .insert("foreign".to_string(), "x".to_string());

        store.clear().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
    }
}

// Key-value persistence with a synced scope for preferences and a local one for device data
// Access is read-modify-write without transactions, so concurrent writers can lose updates

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageResult;

pub mod memory;
pub mod sqlite;

pub const HISTORY_KEY: &str = "history";
pub const PENDING_ACTION_KEY: &str = "pendingAction";
pub const PENDING_SCREENSHOT_KEY: &str = "pendingScreenshot";
pub const USAGE_STATS_KEY: &str = "usageStats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Device-only data
    Local,
    /// User preferences
    Synced,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Synced => "sync",
        }
    }
}

/// Persistent key-value store shared by every context.
pub trait Store: Send + Sync {
    fn get(&self, scope: Scope, key: &str) -> StorageResult<Option<Value>>;

    fn set(&self, scope: Scope, key: &str, value: Value) -> StorageResult<()>;

    fn remove(&self, scope: Scope, key: &str) -> StorageResult<()>;

    /// Remove every key in a scope.
    fn clear(&self, scope: Scope) -> StorageResult<()>;

    /// Snapshot of every key in a scope.
    fn entries(&self, scope: Scope) -> StorageResult<BTreeMap<String, Value>>;
}

/// Read and deserialize a key.
pub fn load<T: DeserializeOwned>(store: &dyn Store, scope: Scope, key: &str) -> StorageResult<Option<T>> {
    match store.get(scope, key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and write a key.
pub fn save<T: Serialize + ?Sized>(store: &dyn Store, scope: Scope, key: &str, value: &T) -> StorageResult<()> {
    store.set(scope, key, serde_json::to_value(value)?)
}

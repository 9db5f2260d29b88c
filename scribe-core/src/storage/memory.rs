// In-memory store
// Used for tests and for sessions that must not touch disk

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{Scope, Store};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(Scope, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<(Scope, String), Value>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.lock()?.get(&(scope, key.to_string())).cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: Value) -> StorageResult<()> {
        self.lock()?.insert((scope, key.to_string()), value);
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> StorageResult<()> {
        self.lock()?.remove(&(scope, key.to_string()));
        Ok(())
    }

    fn clear(&self, scope: Scope) -> StorageResult<()> {
        self.lock()?.retain(|(s, _), _| *s != scope);
        Ok(())
    }

    fn entries(&self, scope: Scope) -> StorageResult<BTreeMap<String, Value>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect())
    }
}

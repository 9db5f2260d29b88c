// Single-slot persisted mailboxes
// A write replaces whatever is there (no queue); a take reads then deletes

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageResult;
use crate::storage::{self, Scope, Store, PENDING_ACTION_KEY, PENDING_SCREENSHOT_KEY};
use crate::types::PendingAction;

pub struct Mailbox<T> {
    store: Arc<dyn Store>,
    key: &'static str,
    _slot: PhantomData<fn() -> T>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Mailbox {
            store: Arc::clone(&self.store),
            key: self.key,
            _slot: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Mailbox<T> {
    pub fn new(store: Arc<dyn Store>, key: &'static str) -> Self {
        Mailbox {
            store,
            key,
            _slot: PhantomData,
        }
    }

    /// Store a value, overwriting any unconsumed one
    pub fn put(&self, value: &T) -> StorageResult<()> {
        storage::save(self.store.as_ref(), Scope::Local, self.key, value)
    }

    pub fn peek(&self) -> StorageResult<Option<T>> {
        storage::load(self.store.as_ref(), Scope::Local, self.key)
    }

    /// Consume the value. Not atomic: two concurrent takers may both see it.
    pub fn take(&self) -> StorageResult<Option<T>> {
        let value = self.peek()?;
        if value.is_some() {
            self.store.remove(Scope::Local, self.key)?;
        }
        Ok(value)
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

/// Context-menu handoff to the next surface that opens
pub fn pending_actions(store: Arc<dyn Store>) -> Mailbox<PendingAction> {
    Mailbox::new(store, PENDING_ACTION_KEY)
}

/// Screenshot data URL waiting for the next surface that opens
pub fn pending_screenshots(store: Arc<dyn Store>) -> Mailbox<String> {
    Mailbox::new(store, PENDING_SCREENSHOT_KEY)
}

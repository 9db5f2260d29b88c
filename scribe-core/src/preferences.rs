// User preferences, stored one key per field in the synced scope
// Missing, unreadable or out-of-range keys fall back to their defaults

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AssistResult, StorageError, StorageResult, ValidationError};
use crate::storage::{Scope, Store};
use crate::types::{Language, Tone};

pub const MAX_HISTORY_RANGE: RangeInclusive<u32> = 10..=500;
pub const TIMEOUT_RANGE: RangeInclusive<u32> = 5..=60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub default_tone: Tone,
    pub default_language: Language,
    pub sidebar_position: SidebarPosition,
    pub auto_copy: bool,
    pub save_history: bool,
    pub max_history_items: u32,
    pub show_animations: bool,
    /// Route to the placeholder backend when no processing capability exists
    pub enable_ai_fallback: bool,
    pub show_timestamps: bool,
    pub auto_process: bool,
    /// Seconds
    pub processing_timeout: u32,
    pub enable_analytics: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            default_tone: Tone::Professional,
            default_language: Language::default(),
            sidebar_position: SidebarPosition::Right,
            auto_copy: false,
            save_history: true,
            max_history_items: 50,
            show_animations: true,
            enable_ai_fallback: true,
            show_timestamps: true,
            auto_process: true,
            processing_timeout: 30,
            enable_analytics: false,
        }
    }
}

impl Preferences {
    /// Read preferences from the synced scope, merged over the defaults
    pub fn load(store: &dyn Store) -> StorageResult<Self> {
        let mut fields = Self::default().to_fields()?;

        for (key, value) in store.entries(Scope::Synced)? {
            let Some(previous) = fields.insert(key.clone(), value) else {
                // Not a preference (foreign key in the synced scope)
                fields.remove(&key);
                continue;
            };
            match serde_json::from_value::<Preferences>(Value::Object(fields.clone())) {
                Ok(prefs) if prefs.validate().is_ok() => {}
                Ok(_) => {
                    warn!("ignoring out-of-range preference '{}'", key);
                    fields.insert(key, previous);
                }
                Err(_) => {
                    warn!("ignoring unreadable preference '{}'", key);
                    fields.insert(key, previous);
                }
            }
        }

        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Validate and write every field; nothing is written when validation fails
    pub fn save(&self, store: &dyn Store) -> AssistResult<()> {
        self.validate()?;
        for (key, value) in self.to_fields().map_err(StorageError::from)? {
            store.set(Scope::Synced, &key, value)?;
        }
        Ok(())
    }

    /// Forget every stored preference so defaults apply again
    pub fn reset(store: &dyn Store) -> StorageResult<()> {
        store.clear(Scope::Synced)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("maxHistoryItems", self.max_history_items, &MAX_HISTORY_RANGE)?;
        check_range("processingTimeout", self.processing_timeout, &TIMEOUT_RANGE)?;
        Ok(())
    }

    /// Set one field from its textual form, e.g. ("autoCopy", "true")
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidValue {
            field: key.to_string(),
            value: raw.to_string(),
        };

        let mut fields = self.to_fields().map_err(|_| invalid())?;
        let current = fields
            .get(key)
            .ok_or_else(|| ValidationError::UnknownSetting(key.to_string()))?;

        let value = match current {
            Value::Bool(_) => Value::Bool(raw.trim().parse().map_err(|_| invalid())?),
            Value::Number(_) => Value::from(raw.trim().parse::<u32>().map_err(|_| invalid())?),
            _ => Value::String(raw.trim().to_string()),
        };
        fields.insert(key.to_string(), value);

        *self = serde_json::from_value(Value::Object(fields)).map_err(|_| invalid())?;
        Ok(())
    }

    /// Field names and values, as stored
    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.processing_timeout))
    }
}

fn check_range(field: &'static str, value: u32, range: &RangeInclusive<u32>) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistError;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_defaults_when_store_empty() -> StorageResult<()> {
        let store = MemoryStore::new();
        let prefs = Preferences::load(&store)?;
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.max_history_items, 50);
        assert_eq!(prefs.timeout(), Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::default();
        prefs.default_tone = Tone::Friendly;
        prefs.default_language = Language::parse("fr").unwrap();
        prefs.auto_copy = true;
        prefs.max_history_items = 120;

        prefs.save(&store).unwrap();

        assert_eq!(store.get(Scope::Synced, "defaultTone").unwrap(), Some(json!("friendly")));
        assert_eq!(Preferences::load(&store).unwrap(), prefs);
    }

    #[test]
    fn test_out_of_range_is_not_written() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::default();
        prefs.max_history_items = 5;

        let err = prefs.save(&store).unwrap_err();
        assert!(matches!(
            err,
            AssistError::Validation(ValidationError::OutOfRange { field: "maxHistoryItems", .. })
        ));
        assert!(store.entries(Scope::Synced).unwrap().is_empty());

        prefs.max_history_items = 50;
        prefs.processing_timeout = 61;
        assert!(prefs.save(&store).is_err());
    }

    #[test]
    fn test_unreadable_field_falls_back_to_default() -> StorageResult<()> {
        let store = MemoryStore::new();
        store.set(Scope::Synced, "defaultLanguage", json!("klingon"))?;
        store.set(Scope::Synced, "autoCopy", json!(true))?;
        store.set(Scope::Synced, "somethingElse", json!(1))?;

        let prefs = Preferences::load(&store)?;
        assert_eq!(prefs.default_language, Language::default());
        assert!(prefs.auto_copy);
        Ok(())
    }

    #[test]
    fn test_out_of_range_field_falls_back_to_default() -> StorageResult<()> {
        let store = MemoryStore::new();
        store.set(Scope::Synced, "maxHistoryItems", json!(0))?;
        store.set(Scope::Synced, "processingTimeout", json!(0))?;
        store.set(Scope::Synced, "showAnimations", json!(false))?;

        let prefs = Preferences::load(&store)?;
        assert_eq!(prefs.max_history_items, 50);
        assert_eq!(prefs.timeout(), Duration::from_secs(30));
        assert!(!prefs.show_animations);
        assert!(prefs.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_set_field_parses_by_type() {
        let mut prefs = Preferences::default();
        prefs.set_field("autoCopy", "true").unwrap();
        prefs.set_field("maxHistoryItems", "200").unwrap();
        prefs.set_field("defaultTone", "academic").unwrap();

        assert!(prefs.auto_copy);
        assert_eq!(prefs.max_history_items, 200);
        assert_eq!(prefs.default_tone, Tone::Academic);

        assert!(matches!(
            prefs.set_field("autoCopy", "maybe"),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            prefs.set_field("colour", "blue"),
            Err(ValidationError::UnknownSetting(_))
        ));
        // Failed updates leave the previous values in place
        assert!(prefs.auto_copy);
    }

    #[test]
    fn test_reset_restores_defaults() -> StorageResult<()> {
        let store = MemoryStore::new();
        store.set(Scope::Synced, "saveHistory", json!(false))?;
        Preferences::reset(&store)?;
        assert!(Preferences::load(&store)?.save_history);
        Ok(())
    }
}

// History CSV export, full-data JSON backup and data wipe
// Files land in ~/Downloads unless another directory is given

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::{
    eyre::{bail, Context},
    Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::history::HistoryRecorder;
use crate::preferences::Preferences;
use crate::storage::{self, Scope, Store, USAGE_STATS_KEY};
use crate::types::HistoryRecord;

pub const BACKUP_VERSION: &str = "1.0";

/// Everything worth keeping, in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub export_date: String,
    pub version: String,
    /// Raw synced-scope entries, foreign keys included
    pub settings: Map<String, Value>,
    pub history: Vec<HistoryRecord>,
    /// Stored counters, or an empty object when none were recorded
    pub usage_stats: Value,
}

/// Snapshot the store as a backup document
pub fn build_backup(store: &Arc<dyn Store>, now: DateTime<Utc>) -> Result<Backup> {
    let settings = store
        .entries(Scope::Synced)
        .context("Failed to read settings")?
        .into_iter()
        .collect();
    let history = HistoryRecorder::new(Arc::clone(store))
        .load()
        .context("Failed to read history")?;
    let usage_stats = store
        .get(Scope::Local, USAGE_STATS_KEY)
        .context("Failed to read usage stats")?
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok(Backup {
        export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: BACKUP_VERSION.to_string(),
        settings,
        history,
        usage_stats,
    })
}

/// Delete every local-scope entry: history, counters and pending handoffs.
/// Preferences survive.
pub fn clear_all_data(store: &dyn Store) -> Result<()> {
    store
        .clear(Scope::Local)
        .context("Failed to clear local data")
}

/// Writes export files into one directory
pub struct ExportWriter {
    base_dir: PathBuf,
}

impl ExportWriter {
    /// Writer targeting ~/Downloads
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        Ok(ExportWriter {
            base_dir: PathBuf::from(home).join("Downloads"),
        })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        ExportWriter { base_dir }
    }

    fn target(&self, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("Failed to create directory: {}", self.base_dir.display()))?;
        Ok(self.base_dir.join(name))
    }

    /// Write `scribe-history-<millis>.csv`
    pub fn write_history_csv(&self, history: &HistoryRecorder, now: DateTime<Utc>) -> Result<PathBuf> {
        let records = history.load().context("Failed to read history")?;
        if records.is_empty() {
            bail!("No history to export");
        }

        let path = self.target(&format!("scribe-history-{}.csv", now.timestamp_millis()))?;
        let csv = crate::csv::history_to_csv(&records);
        fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("exported {} history entries to {}", records.len(), path.display());
        Ok(path)
    }

    /// Write `scribe-backup-<millis>.json`
    pub fn write_backup(&self, store: &Arc<dyn Store>, now: DateTime<Utc>) -> Result<PathBuf> {
        let backup = build_backup(store, now)?;

        let path = self.target(&format!("scribe-backup-{}.json", now.timestamp_millis()))?;
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &backup)?;

        Ok(path)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Read back a backup written by [`ExportWriter::write_backup`]
pub fn read_backup(path: &Path) -> Result<Backup> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let backup: Backup = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a backup file", path.display()))?;
    Ok(backup)
}

/// Persist one value through the store's JSON layer; used when restoring
fn restore_entry(store: &dyn Store, scope: Scope, key: &str, value: &Value) -> Result<()> {
    storage::save(store, scope, key, value).with_context(|| format!("Failed to restore {}", key))
}

/// The backup's preference keys merged over the defaults, checked like a save
fn backup_preferences(settings: &Map<String, Value>) -> Result<Preferences> {
    let mut fields = Preferences::default().to_fields()?;
    for (key, value) in settings {
        if fields.contains_key(key) {
            fields.insert(key.clone(), value.clone());
        }
    }
    let prefs: Preferences =
        serde_json::from_value(Value::Object(fields)).context("Backup contains unreadable settings")?;
    prefs.validate().context("Backup contains invalid settings")?;
    Ok(prefs)
}

/// Put a backup's settings, history and counters back into the store.
/// A backup whose preferences fail validation is rejected before anything is written.
pub fn restore_backup(store: &dyn Store, backup: &Backup) -> Result<()> {
    let prefs = backup_preferences(&backup.settings)?;
    let known = prefs.to_fields()?;

    prefs.save(store).context("Failed to restore settings")?;
    for (key, value) in &backup.settings {
        if !known.contains_key(key) {
            restore_entry(store, Scope::Synced, key, value)?;
        }
    }
    let history = serde_json::to_value(&backup.history)?;
    restore_entry(store, Scope::Local, storage::HISTORY_KEY, &history)?;
    if backup.usage_stats.as_object().map_or(true, |o| !o.is_empty()) {
        restore_entry(store, Scope::Local, USAGE_STATS_KEY, &backup.usage_stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Retention;
    use crate::storage::memory::MemoryStore;
    use crate::storage::PENDING_ACTION_KEY;
    use crate::types::{ActionId, Language, Tone, UsageStats};
    use crate::usage::UsageCounter;
    use serde_json::json;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-11-09T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn seeded_store() -> Arc<dyn Store> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let history = HistoryRecorder::new(Arc::clone(&store));
        history
            .record(
                HistoryRecord::new(
                    now(),
                    ActionId::from("summarize"),
                    "Input, with a comma",
                    "Output \"quoted\"",
                    Tone::Professional,
                    &Language::default(),
                ),
                Retention::from(&Preferences::default()),
            )
            .unwrap();
        UsageCounter::new(Arc::clone(&store)).increment().unwrap();
        let mut prefs = Preferences::default();
        prefs.auto_copy = true;
        prefs.save(store.as_ref()).unwrap();
        store
    }

    #[test]
    fn test_write_history_csv() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = ExportWriter::with_base_dir(temp_dir.path().join("out"));
        let store = seeded_store();

        let path = writer.write_history_csv(&HistoryRecorder::new(store), now())?;

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("scribe-history-{}.csv", now().timestamp_millis())
        );
        let content = fs::read_to_string(path)?;
        assert!(content.starts_with("Timestamp,Action,Input,Output,Tone,Language\n"));
        assert!(content.contains("\"Input, with a comma\""));
        assert!(content.contains("\"Output \"\"quoted\"\"\""));
        Ok(())
    }

    #[test]
    fn test_empty_history_is_not_exported() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = ExportWriter::with_base_dir(temp_dir.path().to_path_buf());
        let history = HistoryRecorder::new(Arc::new(MemoryStore::new()));

        let err = writer.write_history_csv(&history, now()).unwrap_err();
        assert_eq!(err.to_string(), "No history to export");
        assert_eq!(fs::read_dir(temp_dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_backup_document_shape() -> Result<()> {
        let store = seeded_store();
        store.set(Scope::Synced, "somethingElse", json!(42))?;

        let backup = build_backup(&store, now())?;
        let json = serde_json::to_value(&backup)?;

        assert_eq!(json["exportDate"], "2025-11-09T14:30:00.000Z");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["settings"]["autoCopy"], true);
        assert_eq!(json["settings"]["somethingElse"], 42);
        assert_eq!(json["history"].as_array().unwrap().len(), 1);
        assert_eq!(json["usageStats"], json!({"today": 1, "total": 1}));
        Ok(())
    }

    #[test]
    fn test_backup_of_empty_store() -> Result<()> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let backup = build_backup(&store, now())?;

        assert!(backup.settings.is_empty());
        assert!(backup.history.is_empty());
        assert_eq!(backup.usage_stats, json!({}));
        Ok(())
    }

    #[test]
    fn test_backup_file_restores() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = ExportWriter::with_base_dir(temp_dir.path().to_path_buf());
        let store = seeded_store();

        let path = writer.write_backup(&store, now())?;
        assert!(path.ends_with(format!("scribe-backup-{}.json", now().timestamp_millis())));

        let backup = read_backup(&path)?;
        let fresh: Arc<dyn Store> = Arc::new(MemoryStore::new());
        restore_backup(fresh.as_ref(), &backup)?;

        assert!(Preferences::load(fresh.as_ref())?.auto_copy);
        assert_eq!(HistoryRecorder::new(Arc::clone(&fresh)).load()?.len(), 1);
        assert_eq!(
            UsageCounter::new(fresh).load()?,
            UsageStats { today: 1, total: 1 }
        );
        Ok(())
    }

    #[test]
    fn test_backup_with_invalid_settings_is_rejected() -> Result<()> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut backup = build_backup(&seeded_store(), now())?;
        backup.settings.insert("maxHistoryItems".to_string(), json!(0));
        backup.settings.insert("processingTimeout".to_string(), json!(0));

        assert!(restore_backup(store.as_ref(), &backup).is_err());
        assert!(store.entries(Scope::Synced)?.is_empty());
        assert!(store.entries(Scope::Local)?.is_empty());

        // Recording against whatever loads afterwards still keeps the entry
        let prefs = Preferences::load(store.as_ref())?;
        let history = HistoryRecorder::new(Arc::clone(&store));
        let recorded = history.record(backup.history[0].clone(), Retention::from(&prefs))?;
        assert!(recorded.is_some());
        assert_eq!(history.load()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_restore_keeps_foreign_settings() -> Result<()> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut backup = build_backup(&seeded_store(), now())?;
        backup.settings.insert("somethingElse".to_string(), json!(42));

        restore_backup(store.as_ref(), &backup)?;

        assert_eq!(store.get(Scope::Synced, "somethingElse")?, Some(json!(42)));
        assert!(Preferences::load(store.as_ref())?.auto_copy);
        Ok(())
    }

    #[test]
    fn test_clear_all_data_keeps_preferences() -> Result<()> {
        let store = seeded_store();
        store.set(Scope::Local, PENDING_ACTION_KEY, json!({"action": "rewrite", "text": "x"}))?;

        clear_all_data(store.as_ref())?;

        assert!(store.entries(Scope::Local)?.is_empty());
        assert!(Preferences::load(store.as_ref())?.auto_copy);
        Ok(())
    }
}

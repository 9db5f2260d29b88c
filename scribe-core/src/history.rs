// Bounded, newest-first log of completed actions under the local `history` key
// Records are never edited; only tail truncation on insert and a full clear delete them

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use crate::csv;
use crate::error::{StorageResult, ValidationError};
use crate::preferences::{Preferences, MAX_HISTORY_RANGE};
use crate::storage::{self, Scope, Store, HISTORY_KEY};
use crate::types::{ActionId, HistoryRecord};

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Whether and how much history to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub enabled: bool,
    pub max_items: usize,
}

// Limits outside MAX_HISTORY_RANGE are clamped
impl From<&Preferences> for Retention {
    fn from(prefs: &Preferences) -> Self {
        Retention {
            enabled: prefs.save_history,
            max_items: prefs
                .max_history_items
                .clamp(*MAX_HISTORY_RANGE.start(), *MAX_HISTORY_RANGE.end()) as usize,
        }
    }
}

/// Recency window, measured as wall-clock difference from now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl TimeWindow {
    fn max_days(&self) -> Option<f64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Today => Some(1.0),
            TimeWindow::Week => Some(7.0),
            TimeWindow::Month => Some(30.0),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TimeWindow::All),
            "today" => Ok(TimeWindow::Today),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            other => Err(ValidationError::InvalidValue {
                field: "time".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// Lexical by action id
    Action,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "action" => Ok(SortOrder::Action),
            other => Err(ValidationError::InvalidValue {
                field: "sort".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// `None` means all actions
    pub action: Option<ActionId>,
    pub window: TimeWindow,
    pub sort: SortOrder,
}

/// Summary figures for the history viewer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total: usize,
    /// Records from the current UTC calendar day
    pub today: usize,
    pub frequent_action: Option<ActionId>,
    pub average_input_length: usize,
}

#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn Store>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        HistoryRecorder { store }
    }

    /// Every stored record, newest first
    pub fn load(&self) -> StorageResult<Vec<HistoryRecord>> {
        let history: Option<Vec<HistoryRecord>> =
            storage::load(self.store.as_ref(), Scope::Local, HISTORY_KEY)?;
        Ok(history.unwrap_or_default())
    }

    /// Prepend a record and drop the oldest beyond the retention limit.
    ///
    /// Returns the stored record (its id may be bumped to stay strictly increasing),
    /// or `None` when history is disabled.
    pub fn record(&self, mut entry: HistoryRecord, retention: Retention) -> StorageResult<Option<HistoryRecord>> {
        if !retention.enabled {
            debug!("history disabled; not recording {}", entry.action);
            return Ok(None);
        }

        let mut history = self.load()?;
        if let Some(newest) = history.first() {
            if entry.id <= newest.id {
                entry.id = newest.id + 1;
            }
        }

        history.insert(0, entry.clone());
        history.truncate(retention.max_items);
        storage::save(self.store.as_ref(), Scope::Local, HISTORY_KEY, &history)?;

        debug!("recorded {} as history entry {}", entry.action, entry.id);
        Ok(Some(entry))
    }

    pub fn get(&self, id: i64) -> StorageResult<Option<HistoryRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    pub fn list(&self, filter: &HistoryFilter) -> StorageResult<Vec<HistoryRecord>> {
        self.list_at(filter, Utc::now())
    }

    /// Filter and sort relative to `now`
    pub fn list_at(&self, filter: &HistoryFilter, now: DateTime<Utc>) -> StorageResult<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = self
            .load()?
            .into_iter()
            .filter(|r| filter.action.as_ref().map_or(true, |a| &r.action == a))
            .filter(|r| match filter.window.max_days() {
                None => true,
                Some(max_days) => r.created_at().is_some_and(|at| {
                    let days = (now - at).num_milliseconds() as f64 / MILLIS_PER_DAY;
                    days < max_days
                }),
            })
            .collect();

        match filter.sort {
            SortOrder::Newest => records.sort_by_key(|r| std::cmp::Reverse(sort_time(r))),
            SortOrder::Oldest => records.sort_by_key(sort_time),
            SortOrder::Action => records.sort_by(|a, b| a.action.cmp(&b.action)),
        }

        Ok(records)
    }

    /// Atomically reset to an empty list
    pub fn clear(&self) -> StorageResult<()> {
        self.store.set(Scope::Local, HISTORY_KEY, json!([]))
    }

    /// CSV of the full history, ignoring any filter
    pub fn export_csv(&self) -> StorageResult<String> {
        Ok(csv::history_to_csv(&self.load()?))
    }

    pub fn stats(&self) -> StorageResult<HistoryStats> {
        self.stats_at(Utc::now())
    }

    /// Summary counts as of `now`.
    ///
    /// `today` counts records on the same UTC calendar day as `now`, not the local day,
    /// so the figure does not depend on the host time zone. When several actions tie for
    /// most used, the lexically smallest id is reported.
    pub fn stats_at(&self, now: DateTime<Utc>) -> StorageResult<HistoryStats> {
        let history = self.load()?;
        if history.is_empty() {
            return Ok(HistoryStats::default());
        }

        let today = now.date_naive();
        let today_count = history
            .iter()
            .filter(|r| r.created_at().is_some_and(|at| at.date_naive() == today))
            .count();

        let mut counts: BTreeMap<&ActionId, usize> = BTreeMap::new();
        for record in &history {
            *counts.entry(&record.action).or_default() += 1;
        }
        let mut frequent: Option<(&ActionId, usize)> = None;
        for (action, count) in counts {
            if frequent.map_or(true, |(_, best)| count > best) {
                frequent = Some((action, count));
            }
        }

        let input_chars: usize = history.iter().map(|r| r.input.chars().count()).sum();
        let average = (input_chars as f64 / history.len() as f64).round() as usize;

        Ok(HistoryStats {
            total: history.len(),
            today: today_count,
            frequent_action: frequent.map(|(action, _)| action.clone()),
            average_input_length: average,
        })
    }
}

fn sort_time(record: &HistoryRecord) -> i64 {
    record
        .created_at()
        .map(|at| at.timestamp_millis())
        .unwrap_or(record.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::types::{Language, Tone};
    use chrono::Duration;

    fn recorder() -> HistoryRecorder {
        HistoryRecorder::new(Arc::new(MemoryStore::new()))
    }

    fn entry(action: &str, input: &str, at: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord::new(
            at,
            ActionId::from(action),
            input,
            format!("{} result", action),
            Tone::Professional,
            &Language::default(),
        )
    }

    fn keep(max_items: usize) -> Retention {
        Retention {
            enabled: true,
            max_items,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-11-09T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_record_prepends_and_truncates() -> StorageResult<()> {
        let recorder = recorder();
        let start = now();

        for i in 0..12 {
            let at = start + Duration::seconds(i);
            let before = recorder.load()?.len();
            recorder.record(entry("summarize", &format!("input {}", i), at), keep(10))?;

            let after = recorder.load()?;
            assert_eq!(after.len(), (before + 1).min(10));
            assert_eq!(after[0].input, format!("input {}", i));
        }

        let history = recorder.load()?;
        assert_eq!(history.last().unwrap().input, "input 2");
        Ok(())
    }

    #[test]
    fn test_record_is_noop_when_disabled() -> StorageResult<()> {
        let recorder = recorder();
        recorder.record(entry("rewrite", "kept", now()), keep(50))?;

        let stored = recorder.record(
            entry("rewrite", "dropped", now()),
            Retention {
                enabled: false,
                max_items: 50,
            },
        )?;

        assert_eq!(stored, None);
        let history = recorder.load()?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].input, "kept");
        Ok(())
    }

    #[test]
    fn test_ids_strictly_increase_within_same_millisecond() -> StorageResult<()> {
        let recorder = recorder();
        let first = recorder.record(entry("expand", "a", now()), keep(50))?.unwrap();
        let second = recorder.record(entry("expand", "b", now()), keep(50))?.unwrap();
        assert!(second.id > first.id);
        assert_eq!(recorder.get(second.id)?.unwrap().input, "b");
        Ok(())
    }

    #[test]
    fn test_list_filters_by_action_and_window() -> StorageResult<()> {
        let recorder = recorder();
        let now = now();
        recorder.record(entry("translate", "forty days", now - Duration::days(40)), keep(50))?;
        recorder.record(entry("summarize", "ten days", now - Duration::days(10)), keep(50))?;
        recorder.record(entry("translate", "three days", now - Duration::days(3)), keep(50))?;
        recorder.record(entry("summarize", "two hours", now - Duration::hours(2)), keep(50))?;

        let inputs = |filter: HistoryFilter| -> StorageResult<Vec<String>> {
            Ok(recorder
                .list_at(&filter, now)?
                .into_iter()
                .map(|r| r.input)
                .collect())
        };

        assert_eq!(inputs(HistoryFilter::default())?.len(), 4);
        assert_eq!(
            inputs(HistoryFilter {
                window: TimeWindow::Today,
                ..Default::default()
            })?,
            vec!["two hours"]
        );
        assert_eq!(
            inputs(HistoryFilter {
                window: TimeWindow::Week,
                ..Default::default()
            })?,
            vec!["two hours", "three days"]
        );
        assert_eq!(
            inputs(HistoryFilter {
                action: Some(ActionId::from("translate")),
                window: TimeWindow::Month,
                sort: SortOrder::Oldest,
            })?,
            vec!["three days"]
        );
        Ok(())
    }

    #[test]
    fn test_list_sort_orders() -> StorageResult<()> {
        let recorder = recorder();
        let now = now();
        recorder.record(entry("translate", "1", now - Duration::minutes(3)), keep(50))?;
        recorder.record(entry("expand", "2", now - Duration::minutes(2)), keep(50))?;
        recorder.record(entry("rewrite", "3", now - Duration::minutes(1)), keep(50))?;

        let order = |sort: SortOrder| -> StorageResult<Vec<String>> {
            Ok(recorder
                .list_at(&HistoryFilter { sort, ..Default::default() }, now)?
                .into_iter()
                .map(|r| r.input)
                .collect())
        };

        assert_eq!(order(SortOrder::Newest)?, vec!["3", "2", "1"]);
        assert_eq!(order(SortOrder::Oldest)?, vec!["1", "2", "3"]);
        assert_eq!(order(SortOrder::Action)?, vec!["2", "3", "1"]);
        Ok(())
    }

    #[test]
    fn test_clear_and_export_ignore_filters() -> StorageResult<()> {
        let recorder = recorder();
        recorder.record(entry("proofread", "needs, quoting", now()), keep(50))?;

        let csv = recorder.export_csv()?;
        assert!(csv.contains("\"needs, quoting\""));

        recorder.clear()?;
        assert!(recorder.load()?.is_empty());
        assert_eq!(recorder.export_csv()?, "Timestamp,Action,Input,Output,Tone,Language");
        Ok(())
    }

    #[test]
    fn test_stats() -> StorageResult<()> {
        let recorder = recorder();
        let now = now();
        assert_eq!(recorder.stats_at(now)?, HistoryStats::default());

        recorder.record(entry("translate", "1234", now - Duration::days(2)), keep(50))?;
        recorder.record(entry("rewrite", "12345678", now - Duration::minutes(5)), keep(50))?;
        recorder.record(entry("translate", "123", now - Duration::minutes(1)), keep(50))?;

        let stats = recorder.stats_at(now)?;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.frequent_action, Some(ActionId::from("translate")));
        assert_eq!(stats.average_input_length, 5);
        Ok(())
    }

    #[test]
    fn test_stats_day_and_tie_break() -> StorageResult<()> {
        let recorder = recorder();
        let now = DateTime::parse_from_rfc3339("2025-11-09T00:10:00Z")
            .unwrap()
            .with_timezone(&Utc);

        recorder.record(entry("translate", "a", now - Duration::minutes(20)), keep(50))?;
        recorder.record(entry("rewrite", "b", now - Duration::minutes(5)), keep(50))?;

        let stats = recorder.stats_at(now)?;
        // 23:50 UTC the previous evening is not today
        assert_eq!(stats.today, 1);
        assert_eq!(stats.frequent_action, Some(ActionId::from("rewrite")));
        Ok(())
    }

    #[test]
    fn test_retention_from_preferences_stays_in_range() {
        let mut prefs = Preferences::default();
        prefs.max_history_items = 0;
        assert_eq!(Retention::from(&prefs).max_items, 10);

        prefs.max_history_items = 120;
        assert_eq!(Retention::from(&prefs).max_items, 120);
    }
}

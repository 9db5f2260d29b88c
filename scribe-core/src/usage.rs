// Usage counters under the local `usageStats` key
// `today` has no day-boundary reset; it grows in lockstep with `total`

use std::sync::Arc;

use crate::error::StorageResult;
use crate::storage::{self, Scope, Store, USAGE_STATS_KEY};
use crate::types::UsageStats;

#[derive(Clone)]
pub struct UsageCounter {
    store: Arc<dyn Store>,
}

impl UsageCounter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        UsageCounter { store }
    }

    pub fn load(&self) -> StorageResult<UsageStats> {
        let stats: Option<UsageStats> = storage::load(self.store.as_ref(), Scope::Local, USAGE_STATS_KEY)?;
        Ok(stats.unwrap_or_default())
    }

    /// Count one completed action
    pub fn increment(&self) -> StorageResult<UsageStats> {
        let mut stats = self.load()?;
        stats.today += 1;
        stats.total += 1;
        storage::save(self.store.as_ref(), Scope::Local, USAGE_STATS_KEY, &stats)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn test_increment_counts_both() -> StorageResult<()> {
        let counter = UsageCounter::new(Arc::new(MemoryStore::new()));
        assert_eq!(counter.load()?, UsageStats::default());

        counter.increment()?;
        let stats = counter.increment()?;

        assert_eq!(stats, UsageStats { today: 2, total: 2 });
        assert_eq!(counter.load()?, stats);
        Ok(())
    }
}

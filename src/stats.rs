//! Cross-session usage counters for catalog items.
//!
//! The catalog itself is immutable once loaded; the counters that change
//! while sessions run (how often an item was issued, which options were
//! picked) live here as atomics so any number of sessions can share one
//! table without locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::catalog::{Catalog, OptionKey, OPTION_COUNT};

#[derive(Debug, Default)]
struct ItemCounters {
    issued: AtomicU64,
    picks: [AtomicU64; OPTION_COUNT],
}

#[derive(Debug, Default)]
pub struct ItemStats {
    counters: HashMap<String, ItemCounters>,
}

impl ItemStats {
    /// One zeroed counter set per catalog item.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let counters = catalog
            .items()
            .iter()
            .map(|item| (item.id.clone(), ItemCounters::default()))
            .collect();
        Self { counters }
    }

    pub fn record_issued(&self, item_id: &str) {
        if let Some(c) = self.counters.get(item_id) {
            c.issued.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_pick(&self, item_id: &str, key: OptionKey) {
        if let Some(c) = self.counters.get(item_id) {
            c.picks[key.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Times the item has been handed out, across all sessions.
    pub fn usage_count(&self, item_id: &str) -> u64 {
        self.counters
            .get(item_id)
            .map(|c| c.issued.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn pick_counts(&self, item_id: &str) -> Option<[u64; OPTION_COUNT]> {
        let c = self.counters.get(item_id)?;
        let mut out = [0u64; OPTION_COUNT];
        for (slot, counter) in out.iter_mut().zip(c.picks.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        Some(out)
    }

    /// Laplace-smoothed pick frequencies; uniform for unseen items.
    pub fn smoothed_pick_rates(&self, item_id: &str) -> [f64; OPTION_COUNT] {
        let counts = self.pick_counts(item_id).unwrap_or([0; OPTION_COUNT]);
        let total: u64 = counts.iter().sum();
        let denom = total as f64 + OPTION_COUNT as f64;
        let mut out = [0.0; OPTION_COUNT];
        for (slot, &n) in out.iter_mut().zip(counts.iter()) {
            *slot = (n as f64 + 1.0) / denom;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::defaults::default_catalog;

    #[test]
    fn smoothed_rates_start_uniform_and_follow_picks() {
        let catalog = default_catalog();
        let stats = ItemStats::for_catalog(&catalog);
        let id = catalog.items()[0].id.clone();

        assert_eq!(stats.smoothed_pick_rates(&id), [0.25; 4]);

        for _ in 0..4 {
            stats.record_pick(&id, OptionKey::B);
        }
        let rates = stats.smoothed_pick_rates(&id);
        assert!((rates.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((rates[1] - 5.0 / 8.0).abs() < 1e-12);
        assert!((rates[0] - 1.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_items_are_ignored() {
        let stats = ItemStats::default();
        stats.record_issued("nope");
        assert_eq!(stats.usage_count("nope"), 0);
        assert!(stats.pick_counts("nope").is_none());
    }
}

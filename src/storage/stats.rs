//! Posting statistics
//!
//! Every cycle result is folded into [`BotStats`] and persisted to
//! `stats.json`. Persistence failures are logged and the in-memory state
//! carries on; losing a counter update is acceptable, aborting a cycle for
//! it is not.

use super::JsonStore;
use crate::models::{CycleResult, WallpaperSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Days of per-day history kept before pruning
const DAILY_RETENTION_DAYS: usize = 30;

/// Cumulative posting statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStats {
    /// Images posted over the bot's lifetime
    pub total_sent: u64,

    /// Cycles that completed (including short or empty batches)
    pub successful_cycles: u64,

    /// Cycles where the provider query and its fallback both failed
    pub failed_cycles: u64,

    /// Images posted per source id
    pub sources_used: BTreeMap<String, u64>,

    /// Images posted per day (`YYYY-MM-DD`), pruned to the last 30 days
    pub daily: BTreeMap<String, u64>,

    /// Candidates rejected by the portrait, content and duplicate filters
    pub filtered_images: u64,

    /// Operations that ran out of retry attempts
    pub retry_exhaustions: u64,

    /// When this stats record was first created
    pub start_time: DateTime<Utc>,

    /// When the last cycle finished
    pub last_cycle_time: Option<DateTime<Utc>>,
}

impl Default for BotStats {
    fn default() -> Self {
        let mut sources_used = BTreeMap::new();
        for source in WallpaperSource::all() {
            sources_used.insert(source.id().to_string(), 0);
        }
        Self {
            total_sent: 0,
            successful_cycles: 0,
            failed_cycles: 0,
            sources_used,
            daily: BTreeMap::new(),
            filtered_images: 0,
            retry_exhaustions: 0,
            start_time: Utc::now(),
            last_cycle_time: None,
        }
    }
}

impl BotStats {
    pub fn total_cycles(&self) -> u64 {
        self.successful_cycles + self.failed_cycles
    }

    /// Fraction of cycles that completed, 0.0 when none have run
    pub fn success_rate(&self) -> f64 {
        let total = self.total_cycles();
        if total == 0 {
            return 0.0;
        }
        self.successful_cycles as f64 / total as f64
    }

    /// The most recent `n` daily entries, newest last
    pub fn recent_daily(&self, n: usize) -> Vec<(&str, u64)> {
        let skip = self.daily.len().saturating_sub(n);
        self.daily
            .iter()
            .skip(skip)
            .map(|(day, count)| (day.as_str(), *count))
            .collect()
    }
}

/// Applies cycle results to [`BotStats`] and persists after each update
pub struct StatsTracker {
    stats: BotStats,
    store: JsonStore,
}

impl StatsTracker {
    /// Load persisted stats, falling back to a fresh record on corruption
    pub fn load(store: JsonStore) -> Self {
        let stats = match store.load_stats() {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "could not load stats, starting fresh");
                BotStats::default()
            }
        };
        Self { stats, store }
    }

    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    /// Fold one cycle result into the stats and persist
    ///
    /// `filtered` and `retry_exhaustions` are the counts accumulated while
    /// the cycle ran, applied here in one update.
    pub fn record_cycle(&mut self, result: &CycleResult, filtered: u64, retry_exhaustions: u64) {
        if result.is_success() {
            self.stats.successful_cycles += 1;
        } else {
            self.stats.failed_cycles += 1;
        }

        self.stats.total_sent += result.sent as u64;
        self.stats.filtered_images += filtered;
        self.stats.retry_exhaustions += retry_exhaustions;
        self.stats.last_cycle_time = Some(result.timestamp);

        *self
            .stats
            .sources_used
            .entry(result.source.id().to_string())
            .or_insert(0) += result.sent as u64;

        if result.sent > 0 {
            let day = result.timestamp.format("%Y-%m-%d").to_string();
            *self.stats.daily.entry(day).or_insert(0) += result.sent as u64;
        }
        self.prune_daily();

        if let Err(e) = self.store.save_stats(&self.stats) {
            warn!(error = %e, "failed to persist stats, continuing with in-memory state");
        }
    }

    /// Drop daily entries beyond the retention window
    ///
    /// Keys sort lexicographically, which for `YYYY-MM-DD` is
    /// chronological, so the oldest entries are at the front.
    fn prune_daily(&mut self) {
        while self.stats.daily.len() > DAILY_RETENTION_DAYS {
            let Some(oldest) = self.stats.daily.keys().next().cloned() else {
                break;
            };
            self.stats.daily.remove(&oldest);
        }
    }
}

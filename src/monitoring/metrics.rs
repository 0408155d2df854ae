/*!
 * Broker Metrics
 * Event counters and gauges keyed by name
 */

use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Names the broker records under
pub mod names {
    pub const SCOPE_ACQUIRED: &str = "scope.acquired";
    pub const SCOPE_RELEASED: &str = "scope.released";
    pub const SCOPE_ENABLE_FAILED: &str = "scope.enable_failed";
    pub const SCOPES_ACTIVE: &str = "scope.active";
    pub const ACCESS_DENIED: &str = "access.denied";
    pub const ACCESS_SILENCED: &str = "access.silenced";
    pub const RECOVERY_ATTEMPTED: &str = "recovery.attempted";
    pub const RECOVERY_SUCCEEDED: &str = "recovery.succeeded";
    pub const RECOVERY_DECLINED: &str = "recovery.declined";
    pub const BOOKMARK_MINTED: &str = "bookmark.minted";
    pub const BOOKMARK_REFRESHED: &str = "bookmark.refreshed";
    pub const BOOKMARK_EVICTED: &str = "bookmark.evicted";
}

/// Counters only grow; gauges move both ways
pub struct MetricsCollector {
    counters: DashMap<&'static str, u64, RandomState>,
    gauges: DashMap<&'static str, i64, RandomState>,
    started: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            counters: DashMap::with_hasher(RandomState::new()),
            gauges: DashMap::with_hasher(RandomState::new()),
            started: Instant::now(),
        }
    }

    /// Count one occurrence of `name`
    pub fn record(&self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    pub fn adjust_gauge(&self, name: &'static str, delta: i64) {
        *self.gauges.entry(name).or_insert(0) += delta;
    }

    /// Zero when never recorded
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).map(|v| *v).unwrap_or(0)
    }

    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges.get(name).map(|v| *v).unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|entry| (entry.key().to_string(), *entry.value()))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|entry| (entry.key().to_string(), *entry.value()))
                .collect(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy, ordered by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gauges: BTreeMap<String, i64>,
    pub uptime_secs: u64,
}

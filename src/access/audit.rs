/*!
 * Access Audit Trail
 * Scope grants, denials and recoveries, kept for inspection
 */

use super::policy::AccessDenialResponse;
use crate::core::limits::{MAX_AUDIT_EVENTS, MAX_AUDIT_EVENTS_PER_PATH};
use crate::core::AccessMode;
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Denials are warnings, everything else informational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
}

/// How an access attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    Granted,
    /// Served by an outer scope that already covered the item
    Covered,
    Denied { reason: String },
    Silenced { reason: String },
    RecoveryStarted,
    Recovered,
    RecoveryDeclined,
}

impl AuditOutcome {
    fn is_denial(&self) -> bool {
        matches!(
            self,
            AuditOutcome::Denied { .. } | AuditOutcome::Silenced { .. } | AuditOutcome::RecoveryDeclined
        )
    }
}

/// One access attempt on one path
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub path: PathBuf,
    pub ancestor: Option<PathBuf>,
    pub mode: AccessMode,
    pub policy: AccessDenialResponse,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
    pub severity: AuditSeverity,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl AuditEvent {
    pub fn new(
        path: &Path,
        mode: AccessMode,
        policy: AccessDenialResponse,
        outcome: AuditOutcome,
    ) -> Self {
        let severity = if outcome.is_denial() {
            AuditSeverity::Warning
        } else {
            AuditSeverity::Info
        };

        Self {
            path: path.to_path_buf(),
            ancestor: None,
            mode,
            policy,
            outcome,
            severity,
            logged_at: SystemTime::now(),
        }
    }

    pub fn with_ancestor(mut self, ancestor: &Path) -> Self {
        self.ancestor = Some(ancestor.to_path_buf());
        self
    }
}

/// Recent events and the denial tally for one path
#[derive(Default)]
struct PathTrail {
    events: VecDeque<AuditEvent>,
    denials: u64,
}

/// Bounded record of access attempts
///
/// Keeps the last `capacity` events overall and the last
/// `MAX_AUDIT_EVENTS_PER_PATH` per path. Denial tallies are never trimmed.
pub struct AuditLogger {
    timeline: RwLock<VecDeque<AuditEvent>>,
    capacity: usize,
    trails: DashMap<PathBuf, PathTrail, RandomState>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_capacity(MAX_AUDIT_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            timeline: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            trails: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn log(&self, event: AuditEvent) {
        {
            let mut trail = self.trails.entry(event.path.clone()).or_default();
            if event.outcome.is_denial() {
                trail.denials += 1;
            }
            if trail.events.len() == MAX_AUDIT_EVENTS_PER_PATH {
                trail.events.pop_front();
            }
            trail.events.push_back(event.clone());
        }

        let mut timeline = self.timeline.write();
        if timeline.len() == self.capacity {
            timeline.pop_front();
        }
        timeline.push_back(event);
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.timeline.read().iter().rev().take(limit).cloned().collect()
    }

    /// Newest first
    pub fn events_for(&self, path: &Path, limit: usize) -> Vec<AuditEvent> {
        self.trails
            .get(path)
            .map(|trail| trail.events.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn denial_count(&self, path: &Path) -> u64 {
        self.trails.get(path).map(|trail| trail.denials).unwrap_or(0)
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            total_events: self.timeline.read().len(),
            total_denials: self.trails.iter().map(|trail| trail.denials).sum(),
            paths_tracked: self.trails.len(),
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_events: usize,
    pub total_denials: u64,
    pub paths_tracked: usize,
}

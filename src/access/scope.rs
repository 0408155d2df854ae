/*!
 * Scope Handles
 *
 * RAII guard over an enabled security scope. The scope is disabled on the
 * ancestor that was enabled, exactly once, whether the handle is released
 * explicitly or dropped on any exit path.
 */

use crate::core::guard::{Guard, GuardDrop, GuardError, GuardMetadata, GuardResult, Observable};
use crate::core::ResourceHandle;
use crate::monitoring::{metric_names, MetricsCollector};
use crate::platform::SecurityScopeApi;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

const SCOPE_GUARD: &str = "security_scope";

/// Serializes enable/disable calls per ancestor
///
/// Distinct ancestors proceed in parallel.
#[derive(Default)]
pub struct ScopeLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>, RandomState>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Run `f` while holding the lock for `path`
    pub fn with_lock<R>(&self, path: &Path, f: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _held = lock.lock();
        f()
    }
}

/// Open access to an item through its nearest bookmarked ancestor
///
/// # Example
///
/// ```rust,ignore
/// let scope = broker.acquire_scope(&mut file, AccessMode::Read).await?;
/// // Read the file
/// // Scope disabled on drop
/// ```
pub struct ScopeHandle {
    ancestor: ResourceHandle,
    item_path: PathBuf,
    /// False for handles riding on an outer scope; those never disable
    owns_scope: bool,
    platform: Arc<dyn SecurityScopeApi>,
    locks: Arc<ScopeLocks>,
    metrics: Arc<MetricsCollector>,
    metadata: GuardMetadata,
    active: bool,
}

impl ScopeHandle {
    /// Wrap a scope that was just enabled on `ancestor`
    pub(crate) fn opened(
        ancestor: ResourceHandle,
        item_path: PathBuf,
        platform: Arc<dyn SecurityScopeApi>,
        locks: Arc<ScopeLocks>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        metrics.record(metric_names::SCOPE_ACQUIRED);
        metrics.adjust_gauge(metric_names::SCOPES_ACTIVE, 1);

        let handle = Self {
            metadata: GuardMetadata::new(SCOPE_GUARD, ancestor.to_string()),
            ancestor,
            item_path,
            owns_scope: true,
            platform,
            locks,
            metrics,
            active: true,
        };
        handle.on_acquired();
        handle
    }

    /// Handle for an item already covered by `outer`
    pub(crate) fn covered_by(outer: &ScopeHandle, item_path: PathBuf) -> Self {
        let handle = Self {
            metadata: GuardMetadata::new(SCOPE_GUARD, outer.ancestor.to_string()),
            ancestor: outer.ancestor.clone(),
            item_path,
            owns_scope: false,
            platform: outer.platform.clone(),
            locks: outer.locks.clone(),
            metrics: outer.metrics.clone(),
            active: true,
        };
        handle.on_acquired();
        handle
    }

    /// Resource the scope was enabled on
    pub fn ancestor(&self) -> &ResourceHandle {
        &self.ancestor
    }

    /// Item the scope was acquired for
    pub fn item_path(&self) -> &Path {
        &self.item_path
    }

    /// Whether this handle enabled the scope itself
    pub fn owns_scope(&self) -> bool {
        self.owns_scope
    }

    /// Whether `path` is reachable through this still-active scope
    pub fn covers(&self, path: &Path) -> bool {
        self.active && self.ancestor.covers(path)
    }
}

impl Guard for ScopeHandle {
    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }
        self.active = false;

        if self.owns_scope {
            let platform = &self.platform;
            let ancestor = &self.ancestor;
            self.locks
                .with_lock(ancestor.path(), || platform.disable_scope(ancestor));
            self.metrics.record(metric_names::SCOPE_RELEASED);
            self.metrics.adjust_gauge(metric_names::SCOPES_ACTIVE, -1);
        }

        self.on_released();
        Ok(())
    }
}

impl GuardDrop for ScopeHandle {
    fn on_drop(&mut self) {
        if self.active {
            if let Err(e) = self.release() {
                error!(ancestor = %self.ancestor, error = %e, "scope release on drop failed");
                self.on_release_failed(&e);
            }
        }
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl Observable for ScopeHandle {
    fn on_acquired(&self) {
        debug!(
            ancestor = %self.ancestor,
            item = %self.item_path.display(),
            owns_scope = self.owns_scope,
            "scope acquired"
        );
    }

    fn on_released(&self) {
        debug!(
            ancestor = %self.ancestor,
            item = %self.item_path.display(),
            held_us = self.metadata.held_for().as_micros() as u64,
            "scope released"
        );
    }

    fn on_release_failed(&self, error: &GuardError) {
        error!(ancestor = %self.ancestor, error = %error, "scope error");
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("ancestor", &self.ancestor)
            .field("item_path", &self.item_path)
            .field("owns_scope", &self.owns_scope)
            .field("active", &self.active)
            .finish()
    }
}

/*!
 * Access Scope Manager
 * Locates the nearest bookmarked ancestor, enables it, and applies the
 * item's denial policy when that fails
 */

use super::audit::{AuditEvent, AuditLogger, AuditOutcome};
use super::policy::{AccessDenialResponse, PolicySettings};
use super::recovery::RecoveryFlow;
use super::scope::{ScopeHandle, ScopeLocks};
use crate::bookmarks::{Bookmark, BookmarkResolver};
use crate::core::{AccessMode, BookmarkToken, BrokerError, BrokerResult};
use crate::monitoring::{metric_names, MetricsCollector};
use crate::platform::SecurityScopeApi;
use crate::storage::{ItemState, StorageItem};
use crate::vfs::FileSystem;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Acquires and releases security scopes for storage items
pub struct AccessScopeManager {
    platform: Arc<dyn SecurityScopeApi>,
    resolver: Arc<BookmarkResolver>,
    filesystem: Arc<dyn FileSystem>,
    policy: Arc<PolicySettings>,
    recovery: Arc<RecoveryFlow>,
    locks: Arc<ScopeLocks>,
    metrics: Arc<MetricsCollector>,
    audit: Arc<AuditLogger>,
}

impl AccessScopeManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Arc<dyn SecurityScopeApi>,
        resolver: Arc<BookmarkResolver>,
        filesystem: Arc<dyn FileSystem>,
        policy: Arc<PolicySettings>,
        recovery: Arc<RecoveryFlow>,
        metrics: Arc<MetricsCollector>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            platform,
            resolver,
            filesystem,
            policy,
            recovery,
            locks: Arc::new(ScopeLocks::new()),
            metrics,
            audit,
        }
    }

    /// Acquire access to `item` for `mode`
    ///
    /// `Ok(Some)` when access is open, `Ok(None)` for a silent denial, and
    /// `Err` when the effective policy raises. `RequestAccess` runs the
    /// recovery flow and retries exactly once.
    pub async fn acquire(
        &self,
        item: &mut StorageItem,
        mode: AccessMode,
    ) -> BrokerResult<Option<ScopeHandle>> {
        let policy = self.policy.effective(item.policy());
        let mut recovered = false;

        loop {
            let denial = match self.try_acquire(item, mode) {
                Ok(scope) => {
                    let outcome = if recovered {
                        AuditOutcome::Recovered
                    } else {
                        AuditOutcome::Granted
                    };
                    self.audit.log(
                        AuditEvent::new(item.path(), mode, policy, outcome)
                            .with_ancestor(scope.ancestor().path()),
                    );
                    return Ok(Some(scope));
                }
                Err(e) if e.is_denial() => e,
                Err(e) => return Err(e),
            };

            self.metrics.record(metric_names::ACCESS_DENIED);
            debug!(path = %item.path().display(), %mode, %policy, error = %denial, "access denied");

            match policy {
                AccessDenialResponse::RequestAccess if !recovered => {
                    self.audit.log(AuditEvent::new(
                        item.path(),
                        mode,
                        policy,
                        AuditOutcome::RecoveryStarted,
                    ));
                    match self.recovery.request_access(item).await {
                        Ok(()) => recovered = true,
                        Err(declined) => {
                            self.audit.log(AuditEvent::new(
                                item.path(),
                                mode,
                                policy,
                                AuditOutcome::RecoveryDeclined,
                            ));
                            return self.settle(item, mode, self.policy.recovery_fallback(), declined);
                        }
                    }
                }
                AccessDenialResponse::RequestAccess => {
                    return self.settle(item, mode, self.policy.recovery_fallback(), denial)
                }
                other => return self.settle(item, mode, other, denial),
            }
        }
    }

    /// Acquire access for an item that may already sit inside `outer`
    ///
    /// When `outer` covers the item no second enable happens; only the
    /// permission check for `mode` runs and the returned handle does not
    /// disable anything.
    pub async fn acquire_nested(
        &self,
        item: &mut StorageItem,
        mode: AccessMode,
        outer: &ScopeHandle,
    ) -> BrokerResult<Option<ScopeHandle>> {
        if !outer.covers(item.path()) {
            return self.acquire(item, mode).await;
        }

        let policy = self.policy.effective(item.policy());
        match self.check_permission(item.path(), mode) {
            Ok(()) => {
                self.audit.log(
                    AuditEvent::new(item.path(), mode, policy, AuditOutcome::Covered)
                        .with_ancestor(outer.ancestor().path()),
                );
                Ok(Some(ScopeHandle::covered_by(outer, item.path().to_path_buf())))
            }
            Err(denial) => {
                self.metrics.record(metric_names::ACCESS_DENIED);
                let policy = match policy {
                    AccessDenialResponse::RequestAccess => self.policy.recovery_fallback(),
                    other => other,
                };
                self.settle(item, mode, policy, denial)
            }
        }
    }

    /// Nearest bookmarked ancestor of `item`, the item itself included
    ///
    /// Tries, for the item and then each parent in turn: the cached token,
    /// the bookmark store, and a freshly minted token. The first hit wins.
    pub fn locate(&self, item: &mut StorageItem) -> BrokerResult<Bookmark> {
        if let Some(anchor) = item.state().anchor.clone() {
            match self.validate(anchor.handle.path(), &anchor.token) {
                Some(bookmark) => {
                    item.state_mut().anchor = Some(bookmark.clone());
                    return Ok(bookmark);
                }
                None => item.state_mut().anchor = None,
            }
        }

        if let Some(bookmark) = self.bookmark_for(item.state_mut()) {
            return Ok(bookmark);
        }

        let mut cursor = item.parent();
        while let Some(mut ancestor) = cursor {
            if let Some(bookmark) = self.bookmark_for(ancestor.state_mut()) {
                item.state_mut().anchor = Some(bookmark.clone());
                return Ok(bookmark);
            }
            cursor = ancestor.parent();
        }

        Err(BrokerError::NoBookmarkableAncestor {
            path: item.path().to_path_buf(),
        })
    }

    fn try_acquire(&self, item: &mut StorageItem, mode: AccessMode) -> BrokerResult<ScopeHandle> {
        let bookmark = self.locate(item)?;
        let ancestor = bookmark.handle;

        let enabled = self
            .locks
            .with_lock(ancestor.path(), || self.platform.enable_scope(&ancestor));
        if !enabled {
            self.metrics.record(metric_names::SCOPE_ENABLE_FAILED);
            return Err(BrokerError::access_denied(
                item.path(),
                format!("security scope could not be enabled on {}", ancestor),
            ));
        }

        let scope = ScopeHandle::opened(
            ancestor,
            item.path().to_path_buf(),
            self.platform.clone(),
            self.locks.clone(),
            self.metrics.clone(),
        );

        // An early return drops `scope`, which disables it again.
        self.check_permission(item.path(), mode)?;
        Ok(scope)
    }

    /// Reader/writer check that follows a successful enable
    ///
    /// Missing items pass read and delete checks so the operation itself
    /// reports them as not found. Writing a new file needs a writable parent.
    fn check_permission(&self, path: &Path, mode: AccessMode) -> BrokerResult<()> {
        let fs = &self.filesystem;
        let allowed = match mode {
            AccessMode::Scope => true,
            AccessMode::Read => !fs.exists(path) || fs.is_readable(path),
            AccessMode::Write => {
                if fs.exists(path) {
                    fs.is_writable(path)
                } else {
                    path.parent().map(|p| fs.is_writable(p)).unwrap_or(false)
                }
            }
            AccessMode::Delete => !fs.exists(path) || fs.is_deletable(path),
        };

        if allowed {
            Ok(())
        } else {
            Err(BrokerError::access_denied(
                path,
                format!("{} permission refused", mode),
            ))
        }
    }

    /// Bookmark for the resource described by `state`, caching what it finds
    fn bookmark_for(&self, state: &mut ItemState) -> Option<Bookmark> {
        if let Some(token) = state.cached_token.clone() {
            match self.validate(state.handle.path(), &token) {
                Some(bookmark) => {
                    state.cached_token = Some(bookmark.token.clone());
                    return Some(bookmark);
                }
                None => state.cached_token = None,
            }
        }

        if let Some(bookmark) = self.resolver.find_for_path(state.handle.path()) {
            state.cached_token = Some(bookmark.token.clone());
            return Some(bookmark);
        }

        let token = self.resolver.mint(&state.handle)?;
        state.cached_token = Some(token.clone());
        Some(Bookmark {
            handle: state.handle.clone(),
            token,
        })
    }

    /// Resolve a token held outside the store, refreshing it when stale
    ///
    /// An undecodable token is dropped, together with the store record at
    /// `path` when that record holds the very same token.
    fn validate(&self, path: &Path, token: &BookmarkToken) -> Option<Bookmark> {
        match self.resolver.resolve(token) {
            Ok(resolved) if !resolved.is_stale => Some(Bookmark {
                handle: resolved.handle,
                token: token.clone(),
            }),
            Ok(resolved) => Some(self.resolver.refresh(path, resolved.handle, token.clone())),
            Err(e) => {
                self.resolver.evict(path, token, &e.to_string());
                None
            }
        }
    }

    fn settle(
        &self,
        item: &StorageItem,
        mode: AccessMode,
        policy: AccessDenialResponse,
        error: BrokerError,
    ) -> BrokerResult<Option<ScopeHandle>> {
        let reason = error.to_string();
        if policy == AccessDenialResponse::Silent {
            self.metrics.record(metric_names::ACCESS_SILENCED);
            self.audit.log(AuditEvent::new(
                item.path(),
                mode,
                policy,
                AuditOutcome::Silenced { reason },
            ));
            return Ok(None);
        }

        warn!(path = %item.path().display(), %mode, error = %error, "access denied");
        self.audit.log(AuditEvent::new(
            item.path(),
            mode,
            policy,
            AuditOutcome::Denied { reason },
        ));
        Err(error)
    }

    pub fn policy(&self) -> &Arc<PolicySettings> {
        &self.policy
    }

    pub fn resolver(&self) -> &Arc<BookmarkResolver> {
        &self.resolver
    }
}

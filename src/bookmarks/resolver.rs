/*!
 * Bookmark Resolver
 * Finds, mints, refreshes and evicts bookmarks for paths
 */

use super::paths::paths_match;
use super::store::BookmarkStore;
use crate::core::{BookmarkToken, BrokerResult, ResolvedToken, ResourceHandle};
use crate::monitoring::{metric_names, MetricsCollector};
use crate::platform::SecurityScopeApi;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A resolvable bookmark and the resource it stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub handle: ResourceHandle,
    pub token: BookmarkToken,
}

/// Token resolution on top of the bookmark store
pub struct BookmarkResolver {
    platform: Arc<dyn SecurityScopeApi>,
    store: Arc<BookmarkStore>,
    metrics: Arc<MetricsCollector>,
}

impl BookmarkResolver {
    pub fn new(
        platform: Arc<dyn SecurityScopeApi>,
        store: Arc<BookmarkStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            platform,
            store,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<BookmarkStore> {
        &self.store
    }

    /// Exchange a token for a handle
    pub fn resolve(&self, token: &BookmarkToken) -> BrokerResult<ResolvedToken> {
        Ok(self.platform.resolve_token(token)?)
    }

    /// Mint a token without persisting it
    pub fn mint(&self, handle: &ResourceHandle) -> Option<BookmarkToken> {
        let token = self.platform.mint_token(handle);
        if token.is_some() {
            self.metrics.record(metric_names::BOOKMARK_MINTED);
        }
        token
    }

    /// Mint a token for `handle` and persist it
    ///
    /// A persistence failure is logged; the minted token is still returned.
    pub fn create_bookmark(&self, handle: &ResourceHandle) -> Option<BookmarkToken> {
        let token = self.mint(handle)?;
        if let Err(e) = self.store.upsert(handle.path(), token.clone()) {
            warn!(path = %handle, error = %e, "minted bookmark could not be persisted");
        }
        Some(token)
    }

    /// Scan every record for one whose resolved path matches `path`
    ///
    /// Records that fail to decode are evicted as they are met, unless another
    /// writer has replaced their token since the snapshot. A stale match
    /// is replaced by a freshly minted token before it is returned. Records
    /// resolving elsewhere are left alone.
    pub fn find_for_path(&self, path: &Path) -> Option<Bookmark> {
        for record in self.store.records() {
            let record_path = record.location();
            let resolved = match self.resolve(&record.token) {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.evict(&record_path, &record.token, &e.to_string());
                    continue;
                }
            };

            if !paths_match(resolved.handle.path(), path) {
                continue;
            }

            if resolved.is_stale {
                return Some(self.refresh(&record_path, resolved.handle, record.token));
            }
            return Some(Bookmark {
                handle: resolved.handle,
                token: record.token,
            });
        }
        None
    }

    /// Replace a stale token with a fresh one for `handle`
    ///
    /// The fresh token replaces the record at `stored_at` only while that
    /// record still holds `stale`, moving it to the handle's path when the
    /// resource was relocated. A token that was never stored stays in memory.
    /// When the platform refuses to mint, the stale token is kept since it
    /// still resolves.
    pub fn refresh(
        &self,
        stored_at: &Path,
        handle: ResourceHandle,
        stale: BookmarkToken,
    ) -> Bookmark {
        let Some(fresh) = self.mint(&handle) else {
            warn!(path = %handle, "stale bookmark could not be refreshed");
            return Bookmark {
                handle,
                token: stale,
            };
        };

        match self
            .store
            .replace_if(stored_at, handle.path(), &stale, fresh.clone())
        {
            Ok(true) => {}
            Ok(false) => debug!(path = %handle, "stale token not on record, refreshed in memory only"),
            Err(e) => warn!(path = %handle, error = %e, "refreshed bookmark could not be persisted"),
        }

        self.metrics.record(metric_names::BOOKMARK_REFRESHED);
        info!(path = %handle, from = %stored_at.display(), "stale bookmark refreshed");
        Bookmark {
            handle,
            token: fresh,
        }
    }

    /// Existing bookmark for `path`, or a newly minted and persisted one
    pub fn get_or_create_bookmark(&self, path: &Path) -> Option<Bookmark> {
        if let Some(bookmark) = self.find_for_path(path) {
            return Some(bookmark);
        }
        let handle = ResourceHandle::new(path);
        let token = self.create_bookmark(&handle)?;
        Some(Bookmark { handle, token })
    }

    /// Re-key the record at `old` after the resource moved to `new`
    ///
    /// Nothing happens when `old` has no record.
    pub fn relocate(&self, old: &Path, new: &ResourceHandle) -> BrokerResult<()> {
        if self.store.lookup(old).is_none() {
            return Ok(());
        }
        match self.mint(new) {
            Some(token) => self.store.replace(old, new.path(), token),
            None => {
                warn!(from = %old.display(), to = %new, "moved item could not be re-bookmarked");
                self.store.remove(old).map(|_| ())
            }
        }
    }

    /// Delete the record for `path`
    pub fn forget(&self, path: &Path) -> BrokerResult<bool> {
        self.store.remove(path)
    }

    /// Remove a record whose token no longer decodes
    ///
    /// The record survives when it no longer holds `token`.
    pub fn evict(&self, path: &Path, token: &BookmarkToken, reason: &str) {
        match self.store.remove_if(path, token) {
            Ok(true) => {
                self.metrics.record(metric_names::BOOKMARK_EVICTED);
                info!(path = %path.display(), reason, "undecodable bookmark evicted");
            }
            Ok(false) => debug!(path = %path.display(), "bookmark already gone or rewritten"),
            Err(e) => warn!(path = %path.display(), error = %e, "bookmark eviction failed"),
        }
    }
}

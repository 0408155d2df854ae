/*!
 * Bookmark Resolver Tests
 * Scans, eviction, refresh and relocation against the simulated platform
 */

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sandboxed_storage::bookmarks::{BookmarkResolver, BookmarkStore};
use sandboxed_storage::core::limits::BOOKMARKS_KEY;
use sandboxed_storage::core::TokenError;
use sandboxed_storage::monitoring::metric_names;
use sandboxed_storage::platform::SecurityScopeApi;
use sandboxed_storage::{
    BookmarkToken, BrokerError, MemFS, MemoryPreferences, MetricsCollector, ResolvedToken,
    ResourceHandle, SimulatedPlatform,
};
use sandboxed_storage::vfs::FileSystem;

struct Harness {
    mem: Arc<MemFS>,
    platform: Arc<SimulatedPlatform>,
    metrics: Arc<MetricsCollector>,
    resolver: BookmarkResolver,
}

fn harness() -> Harness {
    let mem = Arc::new(MemFS::new());
    for dir in ["/sandbox/docs", "/sandbox/pics", "/sandbox/music"] {
        mem.create_dir(Path::new(dir)).unwrap();
    }
    let platform = Arc::new(SimulatedPlatform::with_filesystem(mem.clone()));
    let metrics = Arc::new(MetricsCollector::new());
    let store = Arc::new(BookmarkStore::new(Arc::new(MemoryPreferences::new()), BOOKMARKS_KEY));
    let resolver = BookmarkResolver::new(platform.clone(), store, metrics.clone());
    Harness {
        mem,
        platform,
        metrics,
        resolver,
    }
}

fn bookmark(h: &Harness, path: &str) -> BookmarkToken {
    h.platform.grant(path);
    h.resolver.create_bookmark(&ResourceHandle::new(path)).unwrap()
}

#[test]
fn test_scan_skips_and_evicts_undecodable_records() {
    let h = harness();
    // Key order puts /sandbox/docs ahead of /sandbox/pics
    let docs = bookmark(&h, "/sandbox/docs");
    bookmark(&h, "/sandbox/pics");
    h.platform.revoke_token(&docs);

    let found = h.resolver.find_for_path(Path::new("/sandbox/pics/")).unwrap();
    assert_eq!(found.handle, ResourceHandle::new("/sandbox/pics"));
    assert!(h.resolver.store().lookup(Path::new("/sandbox/docs")).is_none());
    assert_eq!(h.metrics.counter(metric_names::BOOKMARK_EVICTED), 1);
}

#[test]
fn test_vanished_resource_is_evicted() {
    let h = harness();
    bookmark(&h, "/sandbox/music");
    h.mem.remove_dir_all(Path::new("/sandbox/music")).unwrap();

    assert!(h.resolver.find_for_path(Path::new("/sandbox/music")).is_none());
    assert!(h.resolver.store().is_empty());
}

#[test]
fn test_stale_match_is_refreshed_in_place() {
    let h = harness();
    let original = bookmark(&h, "/sandbox/docs");
    h.platform.mark_stale("/sandbox/docs");

    let found = h.resolver.find_for_path(Path::new("/sandbox/docs")).unwrap();
    assert_ne!(found.token, original);
    assert_eq!(h.resolver.store().lookup(Path::new("/sandbox/docs")), Some(found.token.clone()));
    assert!(!h.platform.resolve_token(&found.token).unwrap().is_stale);
    assert_eq!(h.metrics.counter(metric_names::BOOKMARK_REFRESHED), 1);
}

#[test]
fn test_relocated_resource_moves_its_record() {
    let h = harness();
    bookmark(&h, "/sandbox/docs");
    h.mem
        .rename(Path::new("/sandbox/docs"), Path::new("/sandbox/papers"))
        .unwrap();
    h.platform.relocate("/sandbox/docs", "/sandbox/papers");

    let found = h.resolver.find_for_path(Path::new("/sandbox/papers")).unwrap();
    assert_eq!(found.handle.path(), Path::new("/sandbox/papers"));

    let paths: Vec<String> = h.resolver.store().records().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/sandbox/papers".to_string()]);
}

#[test]
fn test_non_matching_records_are_left_alone() {
    let h = harness();
    bookmark(&h, "/sandbox/docs");
    h.platform.mark_stale("/sandbox/docs");
    let before = h.resolver.store().records();

    assert!(h.resolver.find_for_path(Path::new("/sandbox/pics")).is_none());
    assert_eq!(h.resolver.store().records(), before);
}

#[test]
fn test_mint_declined_is_absent_not_an_error() {
    let h = harness();
    assert!(h.resolver.mint(&ResourceHandle::new("/sandbox/pics")).is_none());
    assert!(h.resolver.get_or_create_bookmark(Path::new("/sandbox/pics")).is_none());
    assert_eq!(h.metrics.counter(metric_names::BOOKMARK_MINTED), 0);
}

#[test]
fn test_resolve_surfaces_undecodable_tokens() {
    let h = harness();
    let err = h
        .resolver
        .resolve(&BookmarkToken::from(b"not a token".to_vec()))
        .unwrap_err();
    assert!(matches!(err, BrokerError::TokenUndecodable { .. }));
}

/// Platform that lets another writer store a fresh token for `path` while
/// the dead token at that path is being resolved
struct RewritingPlatform {
    inner: Arc<SimulatedPlatform>,
    store: Arc<BookmarkStore>,
    path: &'static str,
    dead: BookmarkToken,
    fresh: Mutex<Option<BookmarkToken>>,
}

impl SecurityScopeApi for RewritingPlatform {
    fn mint_token(&self, handle: &ResourceHandle) -> Option<BookmarkToken> {
        self.inner.mint_token(handle)
    }

    fn resolve_token(&self, token: &BookmarkToken) -> Result<ResolvedToken, TokenError> {
        if *token == self.dead {
            if let Some(fresh) = self.fresh.lock().take() {
                self.store.upsert(Path::new(self.path), fresh).unwrap();
            }
        }
        self.inner.resolve_token(token)
    }

    fn enable_scope(&self, handle: &ResourceHandle) -> bool {
        self.inner.enable_scope(handle)
    }

    fn disable_scope(&self, handle: &ResourceHandle) {
        self.inner.disable_scope(handle)
    }
}

#[test]
fn test_scan_eviction_spares_a_concurrently_stored_token() {
    let h = harness();
    let dead = bookmark(&h, "/sandbox/docs");
    let fresh = h
        .platform
        .mint_token(&ResourceHandle::new("/sandbox/docs"))
        .unwrap();
    h.platform.revoke_token(&dead);

    let store = h.resolver.store().clone();
    let platform = Arc::new(RewritingPlatform {
        inner: h.platform.clone(),
        store: store.clone(),
        path: "/sandbox/docs",
        dead,
        fresh: Mutex::new(Some(fresh.clone())),
    });
    let resolver = BookmarkResolver::new(platform, store.clone(), h.metrics.clone());

    assert!(resolver.find_for_path(Path::new("/sandbox/pics")).is_none());
    assert_eq!(store.lookup(Path::new("/sandbox/docs")), Some(fresh.clone()));
    assert_eq!(h.metrics.counter(metric_names::BOOKMARK_EVICTED), 0);

    let found = resolver.find_for_path(Path::new("/sandbox/docs")).unwrap();
    assert_eq!(found.token, fresh);
}

#[test]
fn test_refreshing_an_unstored_token_writes_nothing() {
    let h = harness();
    h.platform.grant("/sandbox/pics");
    let handle = ResourceHandle::new("/sandbox/pics");
    let cached = h.resolver.mint(&handle).unwrap();
    h.platform.mark_stale("/sandbox/pics");

    let resolved = h.resolver.resolve(&cached).unwrap();
    assert!(resolved.is_stale);
    let refreshed = h
        .resolver
        .refresh(Path::new("/sandbox/pics"), resolved.handle, cached.clone());

    assert_ne!(refreshed.token, cached);
    assert!(h.resolver.store().is_empty());
}

#[test]
fn test_refresh_keeps_a_record_rewritten_elsewhere() {
    let h = harness();
    let stale = bookmark(&h, "/sandbox/docs");
    h.platform.mark_stale("/sandbox/docs");
    let resolved = h.resolver.resolve(&stale).unwrap();

    let newer = h.resolver.create_bookmark(&ResourceHandle::new("/sandbox/docs")).unwrap();
    let refreshed = h
        .resolver
        .refresh(Path::new("/sandbox/docs"), resolved.handle, stale);

    assert_ne!(refreshed.token, newer);
    assert_eq!(h.resolver.store().lookup(Path::new("/sandbox/docs")), Some(newer));
}

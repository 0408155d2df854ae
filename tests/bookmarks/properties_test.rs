/*!
 * Bookmark Property Tests
 * Mint/resolve round trips and replace-not-duplicate upserts
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;
use sandboxed_storage::bookmarks::paths::canonical_key;
use sandboxed_storage::bookmarks::BookmarkStore;
use sandboxed_storage::core::limits::BOOKMARKS_KEY;
use sandboxed_storage::platform::SecurityScopeApi;
use sandboxed_storage::{BookmarkToken, MemoryPreferences, ResourceHandle, SimulatedPlatform};

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9 _.-]{1,12}", 1..5)
        .prop_filter("dot segments walk the tree", |parts| {
            parts.iter().all(|p| p != "." && p != "..")
        })
}

fn absolute(parts: &[String], trailing: bool) -> PathBuf {
    let mut raw = format!("/{}", parts.join("/"));
    if trailing {
        raw.push('/');
    }
    PathBuf::from(raw)
}

proptest! {
    #[test]
    fn prop_mint_then_resolve_is_fresh_and_same_path(parts in segments(), trailing in any::<bool>()) {
        let platform = SimulatedPlatform::new();
        let path = absolute(&parts, trailing);
        platform.grant(&path);

        let handle = ResourceHandle::new(&path);
        let token = platform.mint_token(&handle).unwrap();
        let resolved = platform.resolve_token(&token).unwrap();

        prop_assert!(!resolved.is_stale);
        prop_assert_eq!(canonical_key(resolved.handle.path()), canonical_key(&path));
    }

    #[test]
    fn prop_upsert_replaces(parts in segments(), first in any::<u8>(), second in any::<u8>(), trailing in any::<bool>()) {
        let store = BookmarkStore::new(Arc::new(MemoryPreferences::new()), BOOKMARKS_KEY);
        let path = absolute(&parts, false);
        let spelled = absolute(&parts, trailing);

        store.upsert(&path, BookmarkToken::from(vec![first])).unwrap();
        store.upsert(&spelled, BookmarkToken::from(vec![second])).unwrap();

        prop_assert_eq!(store.len(), 1);
        prop_assert_eq!(store.lookup(Path::new(&path)), Some(BookmarkToken::from(vec![second])));
    }
}

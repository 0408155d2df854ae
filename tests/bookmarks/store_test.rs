/*!
 * Bookmark Store Tests
 * Persistence shape and whole-dictionary updates
 */

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use sandboxed_storage::bookmarks::BookmarkStore;
use sandboxed_storage::core::limits::BOOKMARKS_KEY;
use sandboxed_storage::platform::PreferenceStore;
use sandboxed_storage::{BookmarkToken, FilePreferences, MemoryPreferences};
use tempfile::TempDir;

fn token(byte: u8) -> BookmarkToken {
    BookmarkToken::from(vec![byte; 4])
}

#[test]
fn test_dictionary_is_one_blob_under_the_key() {
    let prefs = Arc::new(MemoryPreferences::new());
    let store = BookmarkStore::new(prefs.clone(), BOOKMARKS_KEY);

    store.upsert(Path::new("/sandbox/docs/"), token(1)).unwrap();
    store.upsert(Path::new("/sandbox/pics"), token(2)).unwrap();

    let blob = prefs.get("Bookmarks").unwrap();
    let map: BTreeMap<String, BookmarkToken> = bincode::deserialize(&blob).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("/sandbox/docs"), Some(&token(1)));
}

#[test]
fn test_corrupt_blob_reads_as_empty() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(BOOKMARKS_KEY, vec![0xff; 3]).unwrap();
    let store = BookmarkStore::new(prefs, BOOKMARKS_KEY);

    assert!(store.is_empty());
    store.upsert(Path::new("/a"), token(7)).unwrap();
    assert_eq!(store.lookup(Path::new("/a")), Some(token(7)));
}

#[test]
fn test_remove_reports_whether_a_record_existed() {
    let store = BookmarkStore::new(Arc::new(MemoryPreferences::new()), BOOKMARKS_KEY);
    store.upsert(Path::new("/a"), token(1)).unwrap();

    assert!(store.remove(Path::new("/a/")).unwrap());
    assert!(!store.remove(Path::new("/a")).unwrap());
    assert!(store.lookup(Path::new("/a")).is_none());
}

#[test]
fn test_concurrent_upserts_lose_nothing() {
    let store = Arc::new(BookmarkStore::new(Arc::new(MemoryPreferences::new()), BOOKMARKS_KEY));

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                for j in 0..10u8 {
                    let path = format!("/sandbox/{}/{}", i, j);
                    store.upsert(Path::new(&path), token(i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 80);
}

#[test]
fn test_file_preferences_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prefs.json");

    {
        let store = BookmarkStore::new(Arc::new(FilePreferences::open(&path).unwrap()), BOOKMARKS_KEY);
        store.upsert(Path::new("/sandbox/docs"), token(3)).unwrap();
    }

    let store = BookmarkStore::new(Arc::new(FilePreferences::open(&path).unwrap()), BOOKMARKS_KEY);
    assert_eq!(store.lookup(Path::new("/sandbox/docs")), Some(token(3)));
    assert_eq!(store.records().len(), 1);
}

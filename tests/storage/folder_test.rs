/*!
 * Folder Operation Tests
 * Listing, lookup, creation and deletion of children
 */

use pretty_assertions::assert_eq;
use sandboxed_storage::vfs::FileSystem;
use std::path::Path;
use sandboxed_storage::{
    AccessDenialResponse, BrokerError, CreationCollisionOption, StorageItem,
};

use crate::common::{Fixture, A_TXT, DOCS};

/// `/sandbox/docs` holding `a.txt`, `b.md` and the folder `sub`
fn populated() -> Fixture {
    let fx = Fixture::new();
    fx.write("/sandbox/docs/b.md", b"# b");
    fx.mem.create_dir(Path::new("/sandbox/docs/sub")).unwrap();
    fx.write("/sandbox/docs/sub/c.txt", b"c");
    fx.bookmark(DOCS);
    fx
}

fn names(items: &[StorageItem]) -> Vec<String> {
    items.iter().map(StorageItem::name).collect()
}

#[tokio::test]
async fn test_listing_filters_by_kind_and_pattern() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);

    let all = fx.broker.items(&mut docs, None).await.unwrap().unwrap();
    assert_eq!(names(&all), vec!["a.txt", "b.md", "sub"]);

    let files = fx.broker.files(&mut docs, None).await.unwrap().unwrap();
    assert_eq!(names(&files), vec!["a.txt", "b.md"]);

    let folders = fx.broker.folders(&mut docs, None).await.unwrap().unwrap();
    assert_eq!(names(&folders), vec!["sub"]);
    assert!(folders[0].is_folder());

    let txt = fx.broker.items(&mut docs, Some("*.txt")).await.unwrap().unwrap();
    assert_eq!(names(&txt), vec!["a.txt"]);
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_invalid_pattern_makes_no_platform_calls() {
    let fx = populated();
    fx.platform.clear_calls();
    let mut docs = StorageItem::folder(DOCS);

    let err = fx
        .broker
        .items(&mut docs, Some("[unclosed"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::InvalidPattern { .. }));
    assert!(fx.platform.calls().is_empty());
}

#[tokio::test]
async fn test_listing_a_file_is_rejected() {
    let fx = populated();
    let mut file = StorageItem::file(A_TXT);
    assert!(matches!(
        fx.broker.items(&mut file, None).await,
        Err(BrokerError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn test_lookup_by_name() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS).with_policy(AccessDenialResponse::Silent);

    let item = fx.broker.get_item(&mut docs, "sub").await.unwrap().unwrap();
    assert!(item.is_folder());
    assert_eq!(item.policy(), AccessDenialResponse::Silent);

    assert!(fx.broker.get_file(&mut docs, "a.txt").await.unwrap().is_some());
    assert!(fx.broker.get_file(&mut docs, "sub").await.unwrap().is_none());
    assert!(fx.broker.get_folder(&mut docs, "a.txt").await.unwrap().is_none());
    assert!(fx.broker.get_item(&mut docs, "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_existence_checks_need_no_scope() {
    let fx = populated();
    fx.platform.clear_calls();
    let docs = StorageItem::folder(DOCS);

    assert!(fx.broker.item_exists(&docs, "a.txt"));
    assert!(fx.broker.file_exists(&docs, "a.txt"));
    assert!(!fx.broker.folder_exists(&docs, "a.txt"));
    assert!(fx.broker.folder_exists(&docs, "sub"));
    assert!(!fx.broker.file_exists(&docs, "sub"));
    assert!(!fx.broker.item_exists(&docs, "missing"));
    assert!(fx.platform.calls().is_empty());
}

#[tokio::test]
async fn test_create_collision_options() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);

    let err = fx
        .broker
        .create_file(&mut docs, "a.txt", CreationCollisionOption::FailIfExists)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AlreadyExists { .. }));

    let opened = fx
        .broker
        .create_file(&mut docs, "a.txt", CreationCollisionOption::OpenIfExists)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(opened.name(), "a.txt");
    assert_eq!(fx.read(A_TXT), b"hello");

    let unique = fx
        .broker
        .create_file(&mut docs, "a.txt", CreationCollisionOption::GenerateUniqueName)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unique.name(), "a (1).txt");
    assert!(fx.exists("/sandbox/docs/a (1).txt"));

    fx.broker
        .create_file(&mut docs, "a.txt", CreationCollisionOption::ReplaceExisting)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fx.read(A_TXT), b"");
}

#[tokio::test]
async fn test_open_if_exists_requires_matching_kind() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);

    let err = fx
        .broker
        .create_folder(&mut docs, "a.txt", CreationCollisionOption::OpenIfExists)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_replace_folder_with_file() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);

    let file = fx
        .broker
        .create_file(&mut docs, "sub", CreationCollisionOption::ReplaceExisting)
        .await
        .unwrap()
        .unwrap();
    assert!(file.is_file());
    assert!(!fx.exists("/sandbox/docs/sub/c.txt"));
    assert!(fx.broker.file_exists(&docs, "sub"));
}

#[tokio::test]
async fn test_get_or_create() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);

    let mut reports = fx.broker.get_or_create_folder(&mut docs, "reports").await.unwrap().unwrap();
    let again = fx.broker.get_or_create_folder(&mut docs, "reports").await.unwrap().unwrap();
    assert!(reports.is_equal(&again));

    let mut q1 = fx
        .broker
        .get_or_create_file(&mut reports, "q1.csv")
        .await
        .unwrap()
        .unwrap();
    assert!(fx.broker.write_text(&mut q1, "1,2\n").await.unwrap());
    assert_eq!(fx.read("/sandbox/docs/reports/q1.csv"), b"1,2\n");
    assert_eq!(fx.bookmarked_paths(), vec![DOCS.to_string()]);
}

#[tokio::test]
async fn test_create_rejects_bad_names() {
    let fx = populated();
    let mut docs = StorageItem::folder(DOCS);
    for bad in ["", "..", "x/y"] {
        let result = fx
            .broker
            .create_file(&mut docs, bad, CreationCollisionOption::FailIfExists)
            .await;
        assert!(matches!(result, Err(BrokerError::InvalidName(_))), "{:?}", bad);
    }
}

#[tokio::test]
async fn test_delete_folder_removes_contents_and_bookmark() {
    let fx = populated();
    fx.bookmark("/sandbox/docs/sub");
    let mut sub = StorageItem::folder("/sandbox/docs/sub");

    assert!(fx.broker.delete_folder(&mut sub).await.unwrap());
    assert!(!fx.exists("/sandbox/docs/sub"));
    assert!(!fx.exists("/sandbox/docs/sub/c.txt"));
    assert_eq!(fx.bookmarked_paths(), vec![DOCS.to_string()]);

    let mut file = StorageItem::file(A_TXT);
    assert!(matches!(
        fx.broker.delete_folder(&mut file).await,
        Err(BrokerError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn test_listing_denied_with_silent_policy() {
    let fx = Fixture::new();
    let mut docs = StorageItem::folder(DOCS).with_policy(AccessDenialResponse::Silent);
    assert!(fx.broker.items(&mut docs, None).await.unwrap().is_none());
}

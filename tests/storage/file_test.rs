/*!
 * File Operation Tests
 * Contents, properties, transfers and deletion
 */

use pretty_assertions::assert_eq;
use sandboxed_storage::vfs::{FileSystem, VfsError};
use std::path::Path;
use sandboxed_storage::{
    AccessDenialResponse, BrokerError, NameCollisionOption, StorageItem,
};

use crate::common::{Fixture, A_TXT, DOCS};

const ARCHIVE: &str = "/sandbox/archive";

fn fixture_with_archive() -> Fixture {
    let fx = Fixture::new();
    fx.mem.create_dir(Path::new(ARCHIVE)).unwrap();
    fx.bookmark(DOCS);
    fx.bookmark(ARCHIVE);
    fx
}

#[tokio::test]
async fn test_lines_round_through_the_file() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    let mut file = StorageItem::file(format!("{}/list.txt", DOCS));

    assert!(fx.broker.write_lines(&mut file, &["one", "two"]).await.unwrap());
    assert!(fx.broker.append_lines(&mut file, &["three"]).await.unwrap());
    assert!(fx.broker.append_text(&mut file, "four").await.unwrap());

    let lines = fx.broker.read_lines(&mut file).await.unwrap().unwrap();
    assert_eq!(lines, vec!["one", "two", "three", "four"]);
    assert_eq!(fx.broker.bookmarks().len(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_is_a_storage_error() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    fx.write(A_TXT, &[0xff, 0xfe, 0x00]);

    let mut file = StorageItem::file(A_TXT);
    let err = fx.broker.read_text(&mut file).await.unwrap_err();
    assert!(matches!(err, BrokerError::Storage { cause: VfsError::InvalidData(_), .. }));
    assert_eq!(fx.broker.read_bytes(&mut file).await.unwrap(), Some(vec![0xff, 0xfe, 0x00]));
}

#[tokio::test]
async fn test_missing_file_with_silent_policy_is_none() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);

    let mut file = StorageItem::file(format!("{}/missing.txt", DOCS));
    assert!(matches!(
        fx.broker.read_bytes(&mut file).await,
        Err(BrokerError::Storage { cause: VfsError::NotFound(_), .. })
    ));

    file.set_policy(AccessDenialResponse::Silent);
    assert_eq!(fx.broker.read_bytes(&mut file).await.unwrap(), None);
}

#[tokio::test]
async fn test_properties() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);

    let mut file = StorageItem::file(A_TXT);
    let props = fx.broker.properties(&mut file).await.unwrap().unwrap();
    assert_eq!(props.size, 5);
    assert_eq!(props.file_type, ".txt");
    assert!(props.modified >= props.created);
}

#[tokio::test]
async fn test_copy_leaves_source_and_creates_no_record() {
    let fx = fixture_with_archive();
    let mut file = StorageItem::file(A_TXT);
    let mut archive = StorageItem::folder(ARCHIVE);

    let copy = fx
        .broker
        .copy_to(&mut file, &mut archive, "a-copy.txt")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(copy.path().to_str(), Some("/sandbox/archive/a-copy.txt"));
    assert_eq!(fx.read("/sandbox/archive/a-copy.txt"), b"hello");
    assert!(fx.exists(A_TXT));
    assert_eq!(fx.bookmarked_paths(), vec![ARCHIVE.to_string(), DOCS.to_string()]);
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_copy_refuses_taken_name() {
    let fx = fixture_with_archive();
    fx.write("/sandbox/archive/a.txt", b"old");
    let mut file = StorageItem::file(A_TXT);
    let mut archive = StorageItem::folder(ARCHIVE);

    let err = fx
        .broker
        .copy_to(&mut file, &mut archive, "a.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AlreadyExists { .. }));
    assert_eq!(fx.read("/sandbox/archive/a.txt"), b"old");
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_move_rekeys_the_items_bookmark() {
    let fx = fixture_with_archive();
    fx.bookmark(A_TXT);
    let mut file = StorageItem::file(A_TXT);
    let mut archive = StorageItem::folder(ARCHIVE);

    assert!(fx.broker.move_to(&mut file, &mut archive, "moved.txt").await.unwrap());

    assert_eq!(file.path().to_str(), Some("/sandbox/archive/moved.txt"));
    assert!(!fx.exists(A_TXT));
    assert_eq!(
        fx.bookmarked_paths(),
        vec![
            ARCHIVE.to_string(),
            "/sandbox/archive/moved.txt".to_string(),
            DOCS.to_string(),
        ]
    );
    assert_eq!(fx.broker.read_text(&mut file).await.unwrap().as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_rename_collisions() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    fx.write("/sandbox/docs/b.txt", b"bee");

    let mut file = StorageItem::file(A_TXT);
    let err = fx
        .broker
        .rename(&mut file, "b.txt", NameCollisionOption::FailIfExists)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AlreadyExists { .. }));

    assert!(fx
        .broker
        .rename(&mut file, "b.txt", NameCollisionOption::GenerateUniqueName)
        .await
        .unwrap());
    assert_eq!(file.name(), "b (1).txt");

    assert!(fx
        .broker
        .rename(&mut file, "b.txt", NameCollisionOption::ReplaceExisting)
        .await
        .unwrap());
    assert_eq!(file.name(), "b.txt");
    assert_eq!(fx.read("/sandbox/docs/b.txt"), b"hello");
    assert!(!fx.exists("/sandbox/docs/b (1).txt"));
}

#[tokio::test]
async fn test_rename_rejects_paths() {
    let fx = Fixture::new();
    let mut file = StorageItem::file(A_TXT);
    let err = fx
        .broker
        .rename(&mut file, "../escape.txt", NameCollisionOption::FailIfExists)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::InvalidName(_)));
}

#[tokio::test]
async fn test_delete_removes_file_and_bookmark() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    fx.bookmark(A_TXT);

    let mut file = StorageItem::file(A_TXT);
    assert!(fx.broker.delete(&mut file).await.unwrap());
    assert!(!fx.exists(A_TXT));
    assert_eq!(fx.bookmarked_paths(), vec![DOCS.to_string()]);
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

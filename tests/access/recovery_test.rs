/*!
 * Access Recovery Tests
 * Picker-driven grants, retries and declined recoveries
 */

use std::path::Path;

use pretty_assertions::assert_eq;
use sandboxed_storage::core::limits::UI_THREAD_NAME;
use sandboxed_storage::monitoring::metric_names;
use sandboxed_storage::vfs::{FileSystem, Permissions};
use sandboxed_storage::{AccessDenialResponse, BrokerConfig, BrokerError, ItemKind, StorageItem};

use crate::common::{Fixture, A_TXT, DOCS};

#[tokio::test]
async fn test_recovery_stores_bookmark_and_retries() {
    let fx = Fixture::new();
    fx.picker.select(A_TXT);

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    let text = fx.broker.read_text(&mut file).await.unwrap();

    assert_eq!(text.as_deref(), Some("hello"));
    assert_eq!(fx.bookmarked_paths(), vec![A_TXT.to_string()]);
    assert!(file.cached_token().is_some());
    assert_eq!(fx.broker.metrics().counter(metric_names::RECOVERY_SUCCEEDED), 1);
}

#[tokio::test]
async fn test_recovery_after_enable_failure() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    fx.platform.deny_enable(DOCS);
    fx.picker.select(A_TXT);

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    assert!(fx.broker.write_text(&mut file, "recovered").await.unwrap());
    assert_eq!(fx.read(A_TXT), b"recovered");

    let mut paths = fx.bookmarked_paths();
    paths.sort();
    assert_eq!(paths, vec![DOCS.to_string(), A_TXT.to_string()]);
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_picker_runs_on_the_ui_thread_with_item_context() {
    let fx = Fixture::new();
    fx.picker.select(A_TXT);

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    fx.broker.read_bytes(&mut file).await.unwrap();

    assert_eq!(fx.picker.threads(), vec![Some(UI_THREAD_NAME.to_string())]);
    let requests = fx.picker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, ItemKind::File);
    assert_eq!(requests[0].starting_path.to_str(), Some(DOCS));
    assert_eq!(requests[0].suggested_name.as_deref(), Some("a.txt"));
}

#[tokio::test]
async fn test_cancelled_picker_declines() {
    let fx = Fixture::new();
    fx.picker.cancel();

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    let err = fx.broker.read_text(&mut file).await.unwrap_err();

    assert!(matches!(err, BrokerError::RecoveryDeclined { .. }));
    assert!(fx.broker.bookmarks().is_empty());
}

#[tokio::test]
async fn test_wrong_selection_stores_nothing() {
    let fx = Fixture::new();
    fx.write("/sandbox/docs/b.txt", b"other");
    fx.picker.select("/sandbox/docs/b.txt");

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    let err = fx.broker.read_text(&mut file).await.unwrap_err();

    assert!(matches!(err, BrokerError::RecoveryDeclined { .. }));
    assert!(fx.broker.bookmarks().is_empty());
    assert_eq!(fx.broker.metrics().counter(metric_names::RECOVERY_DECLINED), 1);
}

#[tokio::test]
async fn test_declined_recovery_can_fall_back_to_silence() {
    let fx = Fixture::with_config(
        BrokerConfig::default().with_recovery_fallback(AccessDenialResponse::Silent),
    );
    fx.picker.cancel();

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    assert_eq!(fx.broker.read_text(&mut file).await.unwrap(), None);
}

#[tokio::test]
async fn test_retry_happens_only_once() {
    let fx = Fixture::new();
    fx.bookmark(DOCS);
    fx.mem
        .set_permissions(Path::new(A_TXT), Permissions::none())
        .unwrap();
    fx.picker.select(A_TXT);
    fx.picker.select(A_TXT);

    let mut file = StorageItem::file(A_TXT).with_policy(AccessDenialResponse::RequestAccess);
    let err = fx.broker.read_text(&mut file).await.unwrap_err();

    assert!(matches!(err, BrokerError::AccessDenied { .. }));
    assert_eq!(fx.picker.requests().len(), 1);
    assert_eq!(fx.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_folder_recovery_opens_the_folder() {
    let fx = Fixture::new();
    fx.picker.select(DOCS);

    let mut folder = StorageItem::folder(DOCS).with_policy(AccessDenialResponse::RequestAccess);
    let names: Vec<String> = fx
        .broker
        .items(&mut folder, None)
        .await
        .unwrap()
        .unwrap()
        .iter()
        .map(StorageItem::name)
        .collect();

    assert_eq!(names, vec!["a.txt".to_string()]);
    let requests = fx.picker.requests();
    assert_eq!(requests[0].kind, ItemKind::Folder);
    assert_eq!(requests[0].starting_path.to_str(), Some(DOCS));
    assert_eq!(requests[0].prompt, "Grant access to docs");
}

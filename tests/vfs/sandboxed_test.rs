/*!
 * Sandboxed Filesystem Tests
 * Scope enforcement over the local disk backend
 */

use std::path::Path;
use std::sync::Arc;

use sandboxed_storage::vfs::{FileSystem, VfsError};
use sandboxed_storage::{
    FilePreferences, LocalFS, ResourceHandle, SandboxBroker, SandboxedFs, SecurityScopeApi,
    SimulatedPicker, SimulatedPlatform, StorageItem,
};
use tempfile::TempDir;

struct LocalSetup {
    dir: TempDir,
    local: Arc<dyn FileSystem>,
    platform: Arc<SimulatedPlatform>,
}

impl LocalSetup {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let local: Arc<dyn FileSystem> = Arc::new(LocalFS::new(dir.path()));
        local.create_dir(Path::new("/docs")).unwrap();
        let platform = Arc::new(SimulatedPlatform::with_filesystem(local.clone()));
        Self {
            dir,
            local,
            platform,
        }
    }

    fn broker(&self) -> SandboxBroker {
        let preferences = FilePreferences::open(self.dir.path().join("prefs.json")).unwrap();
        SandboxBroker::builder()
            .platform(self.platform.clone())
            .preferences(Arc::new(preferences))
            .filesystem(Arc::new(SandboxedFs::new(
                self.local.clone(),
                self.platform.clone(),
            )))
            .picker(Arc::new(SimulatedPicker::new(self.platform.clone())))
            .build()
            .unwrap()
    }
}

#[test]
fn test_operations_follow_enabled_scopes() {
    let setup = LocalSetup::new();
    setup.local.write(Path::new("/docs/a.txt"), b"hello").unwrap();
    let fs = SandboxedFs::new(setup.local.clone(), setup.platform.clone());
    let docs = ResourceHandle::new("/docs");

    assert!(matches!(
        fs.read(Path::new("/docs/a.txt")),
        Err(VfsError::PermissionDenied(_))
    ));
    assert!(fs.exists(Path::new("/docs/a.txt")));

    setup.platform.grant("/docs");
    assert!(setup.platform.enable_scope(&docs));
    assert_eq!(fs.read(Path::new("/docs/a.txt")).unwrap(), b"hello");
    assert!(fs.is_writable(Path::new("/docs/a.txt")));

    setup.platform.disable_scope(&docs);
    assert!(!fs.is_readable(Path::new("/docs/a.txt")));
}

#[tokio::test]
async fn test_broker_writes_land_on_disk() {
    let setup = LocalSetup::new();
    let broker = setup.broker();
    setup.platform.grant("/docs");
    broker.get_or_create_bookmark("/docs").unwrap();

    let mut file = StorageItem::file("/docs/notes.txt");
    assert!(broker.write_lines(&mut file, &["first", "second"]).await.unwrap());

    let on_disk = std::fs::read_to_string(setup.dir.path().join("docs/notes.txt")).unwrap();
    assert_eq!(on_disk, "first\nsecond\n");
    assert_eq!(setup.platform.total_active_scopes(), 0);
}

#[tokio::test]
async fn test_bookmarks_persist_in_preferences_file() {
    let setup = LocalSetup::new();
    setup.local.write(Path::new("/docs/a.txt"), b"hello").unwrap();
    {
        let broker = setup.broker();
        setup.platform.grant("/docs");
        broker.get_or_create_bookmark("/docs").unwrap();
    }

    let reopened = setup.broker();
    assert_eq!(reopened.bookmarks().len(), 1);
    let mut file = StorageItem::file("/docs/a.txt");
    assert_eq!(
        reopened.read_text(&mut file).await.unwrap().as_deref(),
        Some("hello")
    );
}

/*!
 * Sandboxed Filesystem
 * Denies every operation outside an active security scope
 */

use std::path::Path;
use std::sync::Arc;

use super::traits::FileSystem;
use super::types::*;

/// Answers whether a path is currently reachable through an enabled scope
pub trait ScopeOracle: Send + Sync {
    fn is_accessible(&self, path: &Path) -> bool;
}

/// Filesystem wrapper enforcing the sandbox
///
/// Existence and kind checks pass through; everything else fails with
/// `PermissionDenied` unless an enabled scope covers the path.
pub struct SandboxedFs {
    inner: Arc<dyn FileSystem>,
    oracle: Arc<dyn ScopeOracle>,
}

impl SandboxedFs {
    pub fn new(inner: Arc<dyn FileSystem>, oracle: Arc<dyn ScopeOracle>) -> Self {
        Self { inner, oracle }
    }

    /// Unrestricted view of the wrapped filesystem
    pub fn inner(&self) -> &Arc<dyn FileSystem> {
        &self.inner
    }

    fn check(&self, path: &Path) -> VfsResult<()> {
        if self.oracle.is_accessible(path) {
            Ok(())
        } else {
            Err(VfsError::PermissionDenied(format!(
                "{} is outside every active scope",
                path.display()
            )))
        }
    }
}

impl FileSystem for SandboxedFs {
    fn read(&self, path: &Path) -> VfsResult<Vec<u8>> {
        self.check(path)?;
        self.inner.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        self.check(path)?;
        self.inner.write(path, data)
    }

    fn append(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        self.check(path)?;
        self.inner.append(path, data)
    }

    fn create(&self, path: &Path) -> VfsResult<()> {
        self.check(path)?;
        self.inner.create(path)
    }

    fn delete(&self, path: &Path) -> VfsResult<()> {
        self.check(path)?;
        self.inner.delete(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn metadata(&self, path: &Path) -> VfsResult<Metadata> {
        self.check(path)?;
        self.inner.metadata(path)
    }

    fn list_dir(&self, path: &Path) -> VfsResult<Vec<Entry>> {
        self.check(path)?;
        self.inner.list_dir(path)
    }

    fn create_dir(&self, path: &Path) -> VfsResult<()> {
        self.check(path)?;
        self.inner.create_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> VfsResult<()> {
        self.check(path)?;
        self.inner.remove_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.check(from)?;
        self.check(to)?;
        self.inner.copy(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.check(from)?;
        self.check(to)?;
        self.inner.rename(from, to)
    }

    fn set_permissions(&self, path: &Path, perms: Permissions) -> VfsResult<()> {
        self.check(path)?;
        self.inner.set_permissions(path, perms)
    }

    fn name(&self) -> &str {
        "sandboxed"
    }

    fn file_type(&self, path: &Path) -> Option<FileType> {
        self.inner.file_type(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.oracle.is_accessible(path) && self.inner.is_readable(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        self.oracle.is_accessible(path) && self.inner.is_writable(path)
    }

    fn is_deletable(&self, path: &Path) -> bool {
        self.oracle.is_accessible(path) && self.inner.is_deletable(path)
    }
}

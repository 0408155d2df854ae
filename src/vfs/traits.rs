/*!
 * VFS Traits
 */

use std::path::Path;

use super::types::*;

/// Byte-level backend the storage operations delegate to
///
/// Paths are absolute within the backend. Nothing here knows about
/// scopes; `SandboxedFs` layers that on top.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> VfsResult<Vec<u8>>;

    /// Replace the contents, creating the file when missing
    fn write(&self, path: &Path, data: &[u8]) -> VfsResult<()>;

    /// Append, creating the file when missing
    fn append(&self, path: &Path, data: &[u8]) -> VfsResult<()>;

    /// Empty file at `path`, truncating an existing one
    fn create(&self, path: &Path) -> VfsResult<()>;

    /// Remove a file; directories are refused
    fn delete(&self, path: &Path) -> VfsResult<()>;

    fn exists(&self, path: &Path) -> bool;

    fn metadata(&self, path: &Path) -> VfsResult<Metadata>;

    /// Children of a directory, sorted by name
    fn list_dir(&self, path: &Path) -> VfsResult<Vec<Entry>>;

    /// Create a directory and any missing parents
    fn create_dir(&self, path: &Path) -> VfsResult<()>;

    fn remove_dir_all(&self, path: &Path) -> VfsResult<()>;

    /// Copy a file's contents to `to`
    fn copy(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Move a file or directory
    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    fn set_permissions(&self, path: &Path, perms: Permissions) -> VfsResult<()>;

    /// Backend name for logs
    fn name(&self) -> &str;

    fn file_type(&self, path: &Path) -> Option<FileType> {
        self.metadata(path).ok().map(|m| m.file_type)
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.metadata(path)
            .map(|m| m.permissions.is_readable())
            .unwrap_or(false)
    }

    fn is_writable(&self, path: &Path) -> bool {
        self.metadata(path)
            .map(|m| !m.permissions.is_readonly())
            .unwrap_or(false)
    }

    /// Deleting takes a writable containing directory
    fn is_deletable(&self, path: &Path) -> bool {
        self.exists(path) && path.parent().is_some_and(|p| self.is_writable(p))
    }
}

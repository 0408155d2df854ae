/*!
 * Local Filesystem Backend
 * Broker paths mapped beneath a root directory on the host
 */

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use super::traits::FileSystem;
use super::types::*;

/// Host filesystem through `std::fs`
///
/// `/docs/a.txt` lives at `<root>/docs/a.txt`.
#[derive(Debug, Clone)]
pub struct LocalFS {
    root: PathBuf,
}

/// Map an I/O failure of `op` on `path` to a `VfsError`
fn failure<'a>(op: &'static str, path: &'a Path) -> impl Fn(io::Error) -> VfsError + 'a {
    move |e| {
        let subject = path.display().to_string();
        match e.kind() {
            ErrorKind::NotFound => VfsError::NotFound(subject),
            ErrorKind::PermissionDenied => VfsError::PermissionDenied(subject),
            ErrorKind::AlreadyExists => VfsError::AlreadyExists(subject),
            _ => VfsError::Io(format!("{} {}: {}", op, subject, e)),
        }
    }
}

fn kind_of(ft: fs::FileType) -> FileType {
    match (ft.is_dir(), ft.is_file()) {
        (true, _) => FileType::Directory,
        (_, true) => FileType::File,
        _ => FileType::Other,
    }
}

#[cfg(unix)]
fn mode_of(md: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    md.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(md: &fs::Metadata) -> u32 {
    if md.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

impl LocalFS {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for `path`; `..` never climbs above the root
    fn host_path(&self, path: &Path) -> PathBuf {
        let mut parts: Vec<_> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::ParentDir => {
                    parts.pop();
                }
                _ => {}
            }
        }
        parts.into_iter().fold(self.root.clone(), |host, part| host.join(part))
    }

    /// Host path for a file, refusing directories
    fn file_path(&self, path: &Path) -> VfsResult<PathBuf> {
        let host = self.host_path(path);
        if host.is_dir() {
            return Err(VfsError::IsADirectory(path.display().to_string()));
        }
        Ok(host)
    }

    /// Host path for a directory, refusing files
    fn dir_path(&self, path: &Path) -> VfsResult<PathBuf> {
        let host = self.host_path(path);
        if host.is_file() {
            return Err(VfsError::NotADirectory(path.display().to_string()));
        }
        Ok(host)
    }

    /// The containing directory of a new entry must already exist
    fn check_parent(host: &Path, path: &Path) -> VfsResult<()> {
        match host.parent() {
            Some(parent) if parent.is_dir() => Ok(()),
            Some(parent) if parent.exists() => {
                Err(VfsError::NotADirectory(path.display().to_string()))
            }
            _ => Err(VfsError::NotFound(format!("parent of {}", path.display()))),
        }
    }
}

impl FileSystem for LocalFS {
    fn read(&self, path: &Path) -> VfsResult<Vec<u8>> {
        fs::read(self.file_path(path)?).map_err(failure("read", path))
    }

    fn write(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let host = self.file_path(path)?;
        Self::check_parent(&host, path)?;
        fs::write(&host, data).map_err(failure("write", path))
    }

    fn append(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let host = self.file_path(path)?;
        Self::check_parent(&host, path)?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&host)
            .and_then(|mut file| file.write_all(data))
            .map_err(failure("append", path))
    }

    fn create(&self, path: &Path) -> VfsResult<()> {
        self.write(path, &[])
    }

    fn delete(&self, path: &Path) -> VfsResult<()> {
        fs::remove_file(self.file_path(path)?).map_err(failure("delete", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.host_path(path).exists()
    }

    fn metadata(&self, path: &Path) -> VfsResult<Metadata> {
        let md = fs::symlink_metadata(self.host_path(path)).map_err(failure("stat", path))?;
        let modified = md.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(Metadata {
            file_type: kind_of(md.file_type()),
            size: md.len(),
            permissions: Permissions::new(mode_of(&md)),
            modified,
            created: md.created().unwrap_or(modified),
        })
    }

    fn list_dir(&self, path: &Path) -> VfsResult<Vec<Entry>> {
        let on_error = failure("list", path);
        let mut entries = fs::read_dir(self.dir_path(path)?)
            .map_err(&on_error)?
            .map(|entry| {
                let entry = entry.map_err(&on_error)?;
                let file_type = entry.file_type().map(kind_of).unwrap_or(FileType::Other);
                Ok(Entry::new(entry.file_name().to_string_lossy(), file_type))
            })
            .collect::<VfsResult<Vec<_>>>()?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_dir(&self, path: &Path) -> VfsResult<()> {
        let host = self.host_path(path);
        if host.is_file() {
            return Err(VfsError::AlreadyExists(path.display().to_string()));
        }
        fs::create_dir_all(&host).map_err(failure("mkdir", path))
    }

    fn remove_dir_all(&self, path: &Path) -> VfsResult<()> {
        let host = self.dir_path(path)?;
        if host == self.root {
            return Err(VfsError::PermissionDenied(path.display().to_string()));
        }
        fs::remove_dir_all(&host).map_err(failure("rmdir", path))
    }

    fn copy(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let target = self.host_path(to);
        Self::check_parent(&target, to)?;
        fs::copy(self.file_path(from)?, &target)
            .map(|_| ())
            .map_err(failure("copy", from))
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let target = self.host_path(to);
        Self::check_parent(&target, to)?;
        fs::rename(self.host_path(from), &target).map_err(failure("rename", from))
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, perms: Permissions) -> VfsResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.host_path(path), fs::Permissions::from_mode(perms.mode))
            .map_err(failure("chmod", path))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, path: &Path, perms: Permissions) -> VfsResult<()> {
        let host = self.host_path(path);
        let mut current = fs::metadata(&host).map_err(failure("chmod", path))?.permissions();
        current.set_readonly(perms.is_readonly());
        fs::set_permissions(&host, current).map_err(failure("chmod", path))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/*!
 * Memory Filesystem
 * Volatile filesystem for tests and the simulated platform
 */

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::traits::FileSystem;
use super::types::*;

#[derive(Debug, Clone)]
enum NodeKind {
    File(Vec<u8>),
    Directory,
}

/// File or directory with its timestamps and mode
#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    permissions: Permissions,
    created: SystemTime,
    modified: SystemTime,
}

impl Node {
    fn file(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::File(data),
            permissions: Permissions::readwrite(),
            created: now,
            modified: now,
        }
    }

    fn directory() -> Self {
        let now = SystemTime::now();
        Self {
            kind: NodeKind::Directory,
            permissions: Permissions::new(0o755),
            created: now,
            modified: now,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::File(_) => FileType::File,
            NodeKind::Directory => FileType::Directory,
        }
    }

    fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Directory => 0,
        }
    }
}

/// Whole tree kept in a path-keyed map
///
/// Cloning shares the underlying tree.
#[derive(Debug, Clone)]
pub struct MemFS {
    nodes: Arc<RwLock<HashMap<PathBuf, Node>>>,
}

impl MemFS {
    /// Create new in-memory filesystem containing only `/`
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(PathBuf::from("/"), Node::directory());
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Absolute, with `.` and `..` resolved lexically
    fn normalize(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for comp in path.components() {
            match comp {
                Component::Normal(c) => components.push(c),
                Component::ParentDir => {
                    components.pop();
                }
                Component::RootDir => components.clear(),
                _ => {}
            }
        }

        let mut result = PathBuf::from("/");
        for comp in components {
            result.push(comp);
        }
        result
    }

    fn display(path: &Path) -> String {
        path.display().to_string()
    }

    /// Parent must exist, be a directory, and be writable
    fn check_parent(nodes: &HashMap<PathBuf, Node>, path: &Path) -> VfsResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| VfsError::InvalidPath(Self::display(path)))?;
        match nodes.get(parent) {
            None => Err(VfsError::NotFound(Self::display(parent))),
            Some(node) if !node.is_dir() => Err(VfsError::NotADirectory(Self::display(parent))),
            Some(node) if node.permissions.is_readonly() => {
                Err(VfsError::PermissionDenied(Self::display(parent)))
            }
            Some(_) => Ok(()),
        }
    }

    fn touch_parent(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        if let Some(parent) = path.parent().and_then(|p| nodes.get_mut(p)) {
            parent.modified = SystemTime::now();
        }
    }
}

impl Default for MemFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemFS {
    fn read(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let path = Self::normalize(path);
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            None => Err(VfsError::NotFound(Self::display(&path))),
            Some(node) => match &node.kind {
                NodeKind::Directory => Err(VfsError::IsADirectory(Self::display(&path))),
                NodeKind::File(_) if !node.permissions.is_readable() => {
                    Err(VfsError::PermissionDenied(Self::display(&path)))
                }
                NodeKind::File(data) => Ok(data.clone()),
            },
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.write();

        match nodes.get_mut(&path) {
            Some(node) if node.is_dir() => Err(VfsError::IsADirectory(Self::display(&path))),
            Some(node) if node.permissions.is_readonly() => {
                Err(VfsError::PermissionDenied(Self::display(&path)))
            }
            Some(node) => {
                node.kind = NodeKind::File(data.to_vec());
                node.modified = SystemTime::now();
                Ok(())
            }
            None => {
                Self::check_parent(&nodes, &path)?;
                nodes.insert(path.clone(), Node::file(data.to_vec()));
                Self::touch_parent(&mut nodes, &path);
                Ok(())
            }
        }
    }

    fn append(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let path = Self::normalize(path);
        {
            let mut nodes = self.nodes.write();
            if let Some(node) = nodes.get_mut(&path) {
                if node.permissions.is_readonly() {
                    return Err(VfsError::PermissionDenied(Self::display(&path)));
                }
                return match &mut node.kind {
                    NodeKind::Directory => Err(VfsError::IsADirectory(Self::display(&path))),
                    NodeKind::File(existing) => {
                        existing.extend_from_slice(data);
                        node.modified = SystemTime::now();
                        Ok(())
                    }
                };
            }
        }
        self.write(&path, data)
    }

    fn create(&self, path: &Path) -> VfsResult<()> {
        self.write(path, &[])
    }

    fn delete(&self, path: &Path) -> VfsResult<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.write();
        match nodes.get(&path) {
            None => return Err(VfsError::NotFound(Self::display(&path))),
            Some(node) if node.is_dir() => {
                return Err(VfsError::IsADirectory(Self::display(&path)))
            }
            Some(_) => {}
        }
        Self::check_parent(&nodes, &path)?;
        nodes.remove(&path);
        Self::touch_parent(&mut nodes, &path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().contains_key(&Self::normalize(path))
    }

    fn metadata(&self, path: &Path) -> VfsResult<Metadata> {
        let path = Self::normalize(path);
        let nodes = self.nodes.read();
        let node = nodes
            .get(&path)
            .ok_or_else(|| VfsError::NotFound(Self::display(&path)))?;
        Ok(Metadata {
            file_type: node.file_type(),
            size: node.size(),
            permissions: node.permissions,
            modified: node.modified,
            created: node.created,
        })
    }

    fn list_dir(&self, path: &Path) -> VfsResult<Vec<Entry>> {
        let path = Self::normalize(path);
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            None => return Err(VfsError::NotFound(Self::display(&path))),
            Some(node) if !node.is_dir() => {
                return Err(VfsError::NotADirectory(Self::display(&path)))
            }
            Some(_) => {}
        }

        let mut entries: Vec<Entry> = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path.as_path()))
            .filter_map(|(p, node)| {
                p.file_name()
                    .map(|n| Entry::new(n.to_string_lossy().into_owned(), node.file_type()))
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_dir(&self, path: &Path) -> VfsResult<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.write();

        let mut current = PathBuf::from("/");
        for comp in path.components().skip(1) {
            current.push(comp);
            match nodes.get(&current) {
                Some(node) if node.is_dir() => continue,
                Some(_) => return Err(VfsError::AlreadyExists(Self::display(&current))),
                None => {
                    Self::check_parent(&nodes, &current)?;
                    nodes.insert(current.clone(), Node::directory());
                    Self::touch_parent(&mut nodes, &current);
                }
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> VfsResult<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.write();
        match nodes.get(&path) {
            None => return Err(VfsError::NotFound(Self::display(&path))),
            Some(node) if !node.is_dir() => {
                return Err(VfsError::NotADirectory(Self::display(&path)))
            }
            Some(_) => {}
        }
        if path == Path::new("/") {
            return Err(VfsError::PermissionDenied("/".to_string()));
        }
        Self::check_parent(&nodes, &path)?;

        nodes.retain(|p, _| !p.starts_with(&path));
        Self::touch_parent(&mut nodes, &path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let from = Self::normalize(from);
        let to = Self::normalize(to);
        let data = self.read(&from)?;
        self.write(&to, &data)
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let from = Self::normalize(from);
        let to = Self::normalize(to);
        if from == to {
            return Ok(());
        }

        let mut nodes = self.nodes.write();
        let source_is_dir = match nodes.get(&from) {
            None => return Err(VfsError::NotFound(Self::display(&from))),
            Some(node) => node.is_dir(),
        };
        if to.starts_with(&from) {
            return Err(VfsError::InvalidPath(Self::display(&to)));
        }
        match nodes.get(&to) {
            Some(node) if node.is_dir() || source_is_dir => {
                return Err(VfsError::AlreadyExists(Self::display(&to)))
            }
            _ => {}
        }
        Self::check_parent(&nodes, &from)?;
        Self::check_parent(&nodes, &to)?;

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|p| p.starts_with(&from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let suffix = old.strip_prefix(&from).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(suffix)
                };
                nodes.insert(new, node);
            }
        }
        Self::touch_parent(&mut nodes, &from);
        Self::touch_parent(&mut nodes, &to);
        Ok(())
    }

    fn set_permissions(&self, path: &Path, perms: Permissions) -> VfsResult<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| VfsError::NotFound(Self::display(&path)))?;
        node.permissions = perms;
        Ok(())
    }

    fn name(&self) -> &str {
        "memfs"
    }
}

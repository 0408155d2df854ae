/*!
 * Core Types
 * Tokens, resource handles and access modes shared across the broker
 */

use crate::bookmarks::paths;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque, platform-issued byte string that can be exchanged for a
/// resource handle, possibly after the process restarts
///
/// The broker never looks inside a token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkToken(Bytes);

impl BookmarkToken {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for BookmarkToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for BookmarkToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BookmarkToken({} bytes)", self.0.len())
    }
}

/// Platform reference to a filesystem resource
///
/// The path is kept normalized: lexically cleaned, without trailing separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    path: PathBuf,
}

impl ResourceHandle {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: paths::normalize(path.as_ref()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component, or the whole path for a root
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Lexical parent; `None` at the filesystem root and above the first
    /// component of a relative path
    pub fn parent(&self) -> Option<ResourceHandle> {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(ResourceHandle::new)
            .filter(|p| p != self)
    }

    pub fn join(&self, name: &str) -> ResourceHandle {
        ResourceHandle::new(self.path.join(name))
    }

    /// Key under which this resource is stored in the bookmark dictionary
    pub fn key(&self) -> String {
        paths::canonical_key(&self.path)
    }

    /// True when `other` is this resource or lies beneath it
    pub fn covers(&self, other: &Path) -> bool {
        paths::normalize(other).starts_with(&self.path)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Outcome of exchanging a token for a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub handle: ResourceHandle,
    /// Still usable, but the platform wants a freshly minted replacement
    pub is_stale: bool,
}

impl ResolvedToken {
    pub fn fresh(handle: ResourceHandle) -> Self {
        Self {
            handle,
            is_stale: false,
        }
    }

    pub fn stale(handle: ResourceHandle) -> Self {
        Self {
            handle,
            is_stale: true,
        }
    }
}

/// Kind of storage item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    File,
    Folder,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => write!(f, "file"),
            ItemKind::Folder => write!(f, "folder"),
        }
    }
}

/// What an acquired scope must additionally permit once enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Scope only, no reader/writer check
    Scope,
    Read,
    Write,
    Delete,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Scope => write!(f, "scope"),
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
            AccessMode::Delete => write!(f, "delete"),
        }
    }
}

/*!
 * VFS Types
 * Entries, metadata and failures reported by a filesystem backend
 */

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

pub type VfsResult<T> = Result<T, VfsError>;

/// Substrate failures, each carrying the path or context it happened on
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum VfsError {
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("{0} is a directory")]
    IsADirectory(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O failure: {0}")]
    Io(String),
}

/// Kind of a filesystem entry
///
/// Anything that is neither a regular file nor a directory is `Other` and
/// is treated like a file by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    File,
    Directory,
    Other,
}

/// Unix permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub mode: u32,
}

impl Permissions {
    const READ_BITS: u32 = 0o444;
    const OWNER_WRITE: u32 = 0o200;

    pub fn new(mode: u32) -> Self {
        Self { mode }
    }

    pub fn readonly() -> Self {
        Self::new(0o444)
    }

    pub fn readwrite() -> Self {
        Self::new(0o644)
    }

    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn is_readable(&self) -> bool {
        self.mode & Self::READ_BITS != 0
    }

    pub fn is_readonly(&self) -> bool {
        self.mode & Self::OWNER_WRITE == 0
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::readwrite()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub file_type: FileType,
    pub size: u64,
    pub permissions: Permissions,
    pub modified: SystemTime,
    pub created: SystemTime,
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub file_type: FileType,
}

impl Entry {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
        }
    }
}

/*!
 * Preference Stores
 * In-memory and JSON-file backed blob storage
 */

use super::traits::PreferenceStore;
use crate::core::{PlatformError, PlatformResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Volatile preference store
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, blob: Vec<u8>) -> PlatformResult<()> {
        self.values.write().insert(key.to_string(), blob);
        Ok(())
    }
}

/// Preference store persisted as one JSON document
///
/// Every `set` rewrites the whole document through a temporary file and a
/// rename, so readers never see a half-written file.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl FilePreferences {
    /// Open the document at `path`, starting empty when it does not exist
    ///
    /// A document that cannot be parsed is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> PlatformResult<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding unreadable preferences");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PlatformError::Preferences(format!("{}: {}", path.display(), e))),
        };

        debug!(path = %path.display(), keys = values.len(), "preferences loaded");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Vec<u8>>) -> PlatformResult<()> {
        let json = serde_json::to_vec_pretty(values)
            .map_err(|e| PlatformError::Preferences(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PlatformError::Preferences(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .map_err(|e| PlatformError::Preferences(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| PlatformError::Preferences(format!("{}: {}", self.path.display(), e)))
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, blob: Vec<u8>) -> PlatformResult<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), blob);
        self.persist(&values)
    }
}

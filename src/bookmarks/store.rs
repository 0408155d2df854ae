/*!
 * Bookmark Store
 * Persistent path-to-token dictionary kept under a single preference key
 *
 * Every mutation loads the whole dictionary, changes it and writes it back
 * inside one critical section, so concurrent writers never lose updates.
 */

use super::paths::{canonical_key, path_from_key};
use crate::core::{BookmarkToken, BrokerResult};
use crate::platform::PreferenceStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

type BookmarkMap = BTreeMap<String, BookmarkToken>;

/// One persisted bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub path: String,
    pub token: BookmarkToken,
}

impl BookmarkRecord {
    /// Path the record is keyed under
    pub fn location(&self) -> PathBuf {
        path_from_key(&self.path)
    }
}

/// Persistent bookmark dictionary
pub struct BookmarkStore {
    preferences: Arc<dyn PreferenceStore>,
    key: String,
    critical: Mutex<()>,
}

impl BookmarkStore {
    pub fn new(preferences: Arc<dyn PreferenceStore>, key: impl Into<String>) -> Self {
        Self {
            preferences,
            key: key.into(),
            critical: Mutex::new(()),
        }
    }

    /// Preference key the dictionary lives under
    pub fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> BookmarkMap {
        match self.preferences.get(&self.key) {
            None => BookmarkMap::new(),
            Some(blob) => bincode::deserialize(&blob).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "bookmark dictionary unreadable, starting empty");
                BookmarkMap::new()
            }),
        }
    }

    fn save(&self, map: &BookmarkMap) -> BrokerResult<()> {
        let blob = bincode::serialize(map).map_err(|e| {
            crate::core::PlatformError::Preferences(format!("encode bookmarks: {}", e))
        })?;
        self.preferences.set(&self.key, blob)?;
        Ok(())
    }

    /// Token stored for `path`, if any
    pub fn lookup(&self, path: &Path) -> Option<BookmarkToken> {
        let _critical = self.critical.lock();
        self.load().remove(&canonical_key(path))
    }

    /// Insert or replace the record for `path`
    pub fn upsert(&self, path: &Path, token: BookmarkToken) -> BrokerResult<()> {
        let key = canonical_key(path);
        let _critical = self.critical.lock();
        let mut map = self.load();
        map.insert(key.clone(), token);
        self.save(&map)?;
        debug!(path = %key, records = map.len(), "bookmark stored");
        Ok(())
    }

    /// Delete the record for `path`; `false` when there was none
    pub fn remove(&self, path: &Path) -> BrokerResult<bool> {
        let key = canonical_key(path);
        let _critical = self.critical.lock();
        let mut map = self.load();
        if map.remove(&key).is_none() {
            return Ok(false);
        }
        self.save(&map)?;
        debug!(path = %key, records = map.len(), "bookmark removed");
        Ok(true)
    }

    /// Delete the record for `path` only while it still holds `expected`
    ///
    /// `false` when the record is missing or was rewritten in the meantime.
    pub fn remove_if(&self, path: &Path, expected: &BookmarkToken) -> BrokerResult<bool> {
        let key = canonical_key(path);
        let _critical = self.critical.lock();
        let mut map = self.load();
        if map.get(&key) != Some(expected) {
            return Ok(false);
        }
        map.remove(&key);
        self.save(&map)?;
        debug!(path = %key, records = map.len(), "bookmark removed");
        Ok(true)
    }

    /// Move the record at `old` to `new` with a fresh token
    pub fn replace(&self, old: &Path, new: &Path, token: BookmarkToken) -> BrokerResult<()> {
        let old_key = canonical_key(old);
        let new_key = canonical_key(new);
        let _critical = self.critical.lock();
        let mut map = self.load();
        map.remove(&old_key);
        map.insert(new_key.clone(), token);
        self.save(&map)?;
        debug!(from = %old_key, to = %new_key, "bookmark re-keyed");
        Ok(())
    }

    /// Like [`replace`](Self::replace), but only while `old` still holds
    /// `expected`
    pub fn replace_if(
        &self,
        old: &Path,
        new: &Path,
        expected: &BookmarkToken,
        token: BookmarkToken,
    ) -> BrokerResult<bool> {
        let old_key = canonical_key(old);
        let new_key = canonical_key(new);
        let _critical = self.critical.lock();
        let mut map = self.load();
        if map.get(&old_key) != Some(expected) {
            return Ok(false);
        }
        map.remove(&old_key);
        map.insert(new_key.clone(), token);
        self.save(&map)?;
        debug!(from = %old_key, to = %new_key, "bookmark swapped");
        Ok(true)
    }

    /// Snapshot of all records in key order
    pub fn records(&self) -> Vec<BookmarkRecord> {
        let _critical = self.critical.lock();
        self.load()
            .into_iter()
            .map(|(path, token)| BookmarkRecord { path, token })
            .collect()
    }

    pub fn len(&self) -> usize {
        let _critical = self.critical.lock();
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record
    pub fn clear(&self) -> BrokerResult<()> {
        let _critical = self.critical.lock();
        self.save(&BookmarkMap::new())
    }
}

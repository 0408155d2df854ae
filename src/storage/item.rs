/*!
 * Storage Items
 * Files and folders the broker mediates access to
 */

use crate::access::AccessDenialResponse;
use crate::bookmarks::paths::paths_match;
use crate::bookmarks::Bookmark;
use crate::core::{BookmarkToken, ItemKind, ResourceHandle};
use std::path::Path;

/// State shared by both item variants
#[derive(Debug, Clone)]
pub struct ItemState {
    pub(crate) handle: ResourceHandle,
    /// Token for the item itself, once one has been found or minted
    pub(crate) cached_token: Option<BookmarkToken>,
    /// Nearest bookmarked ancestor found by the last lookup
    pub(crate) anchor: Option<Bookmark>,
    pub(crate) policy: AccessDenialResponse,
}

impl ItemState {
    fn new(path: &Path, policy: AccessDenialResponse) -> Self {
        Self {
            handle: ResourceHandle::new(path),
            cached_token: None,
            anchor: None,
            policy,
        }
    }
}

/// A file or folder
///
/// Items are plain values; they may be stale descriptions of the disk.
#[derive(Debug, Clone)]
pub enum StorageItem {
    File(ItemState),
    Folder(ItemState),
}

impl StorageItem {
    pub fn file(path: impl AsRef<Path>) -> Self {
        StorageItem::File(ItemState::new(path.as_ref(), AccessDenialResponse::GlobalDefault))
    }

    pub fn folder(path: impl AsRef<Path>) -> Self {
        StorageItem::Folder(ItemState::new(path.as_ref(), AccessDenialResponse::GlobalDefault))
    }

    pub fn with_policy(mut self, policy: AccessDenialResponse) -> Self {
        self.set_policy(policy);
        self
    }

    pub(crate) fn state(&self) -> &ItemState {
        match self {
            StorageItem::File(state) | StorageItem::Folder(state) => state,
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut ItemState {
        match self {
            StorageItem::File(state) | StorageItem::Folder(state) => state,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            StorageItem::File(_) => ItemKind::File,
            StorageItem::Folder(_) => ItemKind::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageItem::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, StorageItem::Folder(_))
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.state().handle
    }

    pub fn path(&self) -> &Path {
        self.state().handle.path()
    }

    pub fn name(&self) -> String {
        self.state().handle.name()
    }

    /// Lower-cased extension with its dot, or empty for folders and
    /// extensionless files
    pub fn file_type(&self) -> String {
        if self.is_folder() {
            return String::new();
        }
        self.path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    pub fn policy(&self) -> AccessDenialResponse {
        self.state().policy
    }

    pub fn set_policy(&mut self, policy: AccessDenialResponse) {
        self.state_mut().policy = policy;
    }

    /// Token cached on this item, if any
    pub fn cached_token(&self) -> Option<&BookmarkToken> {
        self.state().cached_token.as_ref()
    }

    /// Containing folder, computed from the path alone
    ///
    /// The parent carries the same policy. `None` at the root.
    pub fn parent(&self) -> Option<StorageItem> {
        self.state()
            .handle
            .parent()
            .map(|handle| StorageItem::folder(handle.path()).with_policy(self.policy()))
    }

    /// Same resource, whatever the spelling of the path
    pub fn is_equal(&self, other: &StorageItem) -> bool {
        paths_match(self.path(), other.path())
    }

    /// Child of this folder named `name`, inheriting the policy
    pub(crate) fn child(&self, name: &str, kind: ItemKind) -> StorageItem {
        let path = self.state().handle.join(name);
        let child = match kind {
            ItemKind::File => StorageItem::file(path.path()),
            ItemKind::Folder => StorageItem::folder(path.path()),
        };
        child.with_policy(self.policy())
    }

    /// Take over a bookmark granted for this item
    pub(crate) fn adopt(&mut self, bookmark: Bookmark) {
        let state = self.state_mut();
        state.handle = bookmark.handle;
        state.cached_token = Some(bookmark.token);
        state.anchor = None;
    }

    /// Point the item at a new location, dropping cached lookups
    pub(crate) fn relocate(&mut self, handle: ResourceHandle) {
        let state = self.state_mut();
        state.handle = handle;
        state.cached_token = None;
        state.anchor = None;
    }
}

/*!
 * Platform Traits
 * Collaborators the broker consumes but does not implement
 */

use crate::core::{BookmarkToken, ItemKind, PlatformResult, ResolvedToken, ResourceHandle, TokenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Platform token API for security-scoped bookmarks
///
/// Enable/disable calls are counted by the platform: every successful
/// `enable_scope` must be balanced by exactly one `disable_scope` on the
/// same handle.
#[cfg_attr(test, mockall::automock)]
pub trait SecurityScopeApi: Send + Sync {
    /// Mint a persistent token for `handle`; `None` when the platform refuses
    fn mint_token(&self, handle: &ResourceHandle) -> Option<BookmarkToken>;

    /// Exchange a token for a handle and a staleness flag
    fn resolve_token(&self, token: &BookmarkToken) -> Result<ResolvedToken, TokenError>;

    /// Open the sandbox for `handle` and its descendants
    fn enable_scope(&self, handle: &ResourceHandle) -> bool;

    /// Close a previously enabled scope
    fn disable_scope(&self, handle: &ResourceHandle);
}

/// Per-process key-value blob storage that survives restarts
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&self, key: &str, blob: Vec<u8>) -> PlatformResult<()>;
}

/// What the picker is asked to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerRequest {
    pub kind: ItemKind,
    /// Folder the picker opens in
    pub starting_path: PathBuf,
    /// Pre-selected entry for file pickers
    pub suggested_name: Option<String>,
    pub prompt: String,
}

/// Native file/folder picker
///
/// Always invoked on the UI context. Returns the chosen path, or `None`
/// when the user cancels.
pub trait NativePicker: Send + Sync {
    fn pick(&self, request: &PickerRequest) -> Option<PathBuf>;
}

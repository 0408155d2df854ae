/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::vfs::VfsError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Result type for platform collaborator calls
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Broker errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BrokerError {
    #[error("Bookmark token could not be decoded: {reason}")]
    #[diagnostic(
        code(broker::token_undecodable),
        help("The resource was deleted or the token was revoked. The user must grant access again.")
    )]
    TokenUndecodable { reason: String },

    #[error("Access denied to {}: {reason}", path.display())]
    #[diagnostic(
        code(broker::access_denied),
        help("Grant access to the item or one of its folders through the picker.")
    )]
    AccessDenied { path: PathBuf, reason: String },

    #[error("Access recovery declined for {}", path.display())]
    #[diagnostic(
        code(broker::recovery_declined),
        help("The picker was cancelled or a different item was selected.")
    )]
    RecoveryDeclined { path: PathBuf },

    #[error("No bookmarkable ancestor for {}", path.display())]
    #[diagnostic(
        code(broker::no_bookmarkable_ancestor),
        help("Neither the item nor any of its folders holds a usable bookmark.")
    )]
    NoBookmarkableAncestor { path: PathBuf },

    #[error("Storage operation failed on {}: {cause}", path.display())]
    #[diagnostic(code(broker::storage), help("Check that the item still exists."))]
    Storage {
        path: PathBuf,
        #[source]
        cause: VfsError,
    },

    #[error("{} already exists", path.display())]
    #[diagnostic(
        code(broker::already_exists),
        help("Pick another name or a collision option that replaces or renames.")
    )]
    AlreadyExists { path: PathBuf },

    #[error("Invalid item name: {0:?}")]
    #[diagnostic(
        code(broker::invalid_name),
        help("Names must be non-empty and must not contain path separators.")
    )]
    InvalidName(String),

    #[error("Invalid name pattern {pattern:?}: {reason}")]
    #[diagnostic(code(broker::invalid_pattern), help("Use `*` and `?` wildcards."))]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid path: {0}")]
    #[diagnostic(code(broker::invalid_path))]
    InvalidPath(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Platform(#[from] PlatformError),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(broker::config))]
    Config(String),
}

impl BrokerError {
    pub fn access_denied(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BrokerError::AccessDenied {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: impl AsRef<Path>, cause: VfsError) -> Self {
        BrokerError::Storage {
            path: path.as_ref().to_path_buf(),
            cause,
        }
    }

    /// Denials that go through the item's access denial response
    ///
    /// A missing bookmarkable ancestor is surfaced the same way as a scope
    /// that could not be enabled.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            BrokerError::AccessDenied { .. } | BrokerError::NoBookmarkableAncestor { .. }
        )
    }

    /// Path the error refers to, when there is one
    pub fn path(&self) -> Option<&Path> {
        match self {
            BrokerError::AccessDenied { path, .. }
            | BrokerError::RecoveryDeclined { path }
            | BrokerError::NoBookmarkableAncestor { path }
            | BrokerError::Storage { path, .. }
            | BrokerError::AlreadyExists { path } => Some(path),
            _ => None,
        }
    }
}

/// Token API failures
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TokenError {
    #[error("Token undecodable: {0}")]
    #[diagnostic(code(platform::token_undecodable))]
    Undecodable(String),
}

impl From<TokenError> for BrokerError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Undecodable(reason) => BrokerError::TokenUndecodable { reason },
        }
    }
}

/// Failures of platform collaborators other than the token API
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PlatformError {
    #[error("Preference write failed: {0}")]
    #[diagnostic(
        code(platform::preferences),
        help("Bookmarks could not be persisted. Check the preferences file location.")
    )]
    Preferences(String),

    #[error("UI context unavailable")]
    #[diagnostic(
        code(platform::ui_unavailable),
        help("The UI thread has shut down; recovery cannot show a picker.")
    )]
    UiUnavailable,
}

/*!
 * Storage Options
 * Collision handling for create, copy, move and rename
 */

use serde::{Deserialize, Serialize};

/// What `create_file`/`create_folder` do when the name is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationCollisionOption {
    /// Pick `name (n).ext` instead
    GenerateUniqueName,
    /// Replace the existing item
    ReplaceExisting,
    /// Fail with `AlreadyExists`
    #[default]
    FailIfExists,
    /// Return the existing item
    OpenIfExists,
}

/// What `rename` does when the name is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCollisionOption {
    GenerateUniqueName,
    ReplaceExisting,
    #[default]
    FailIfExists,
}

/// Item properties read under a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProperties {
    pub size: u64,
    pub created: std::time::SystemTime,
    pub modified: std::time::SystemTime,
    pub file_type: String,
}

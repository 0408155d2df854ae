/*!
 * Storage Items and Operations
 * Files and folders whose every operation runs under a security scope
 */

mod file;
mod folder;
pub mod item;
pub mod options;
pub mod pattern;

pub use item::{ItemState, StorageItem};
pub use options::{CreationCollisionOption, ItemProperties, NameCollisionOption};
pub use pattern::NamePattern;

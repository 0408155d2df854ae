/*!
 * Bookmarks
 * Persistent security-scoped bookmarks keyed by path
 */

pub mod paths;
pub mod resolver;
pub mod store;

pub use resolver::{Bookmark, BookmarkResolver};
pub use store::{BookmarkRecord, BookmarkStore};

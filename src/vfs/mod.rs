/*!
 * Virtual File System Module
 * Pluggable filesystem abstraction the storage operations delegate to
 */

pub mod local;
pub mod memory;
pub mod sandboxed;
pub mod traits;
pub mod types;

// Re-exports
pub use local::LocalFS;
pub use memory::MemFS;
pub use sandboxed::{SandboxedFs, ScopeOracle};
pub use traits::FileSystem;
pub use types::{Entry, FileType, Metadata, Permissions, VfsError, VfsResult};

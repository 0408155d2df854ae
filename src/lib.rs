/*!
 * Sandboxed Storage Library
 * Security-scoped bookmark broker with file and folder operations on top
 */

pub mod access;
pub mod bookmarks;
pub mod broker;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod platform;
pub mod storage;
pub mod vfs;

// Re-exports
pub use access::{AccessDenialResponse, AuditLogger, ScopeHandle};
pub use bookmarks::{Bookmark, BookmarkRecord};
pub use broker::{SandboxBroker, SandboxBrokerBuilder};
pub use config::BrokerConfig;
pub use crate::core::{
    AccessMode, BookmarkToken, BrokerError, BrokerResult, ItemKind, ResolvedToken,
    ResourceHandle,
};
pub use monitoring::{init_tracing, MetricsCollector};
pub use platform::{
    FilePreferences, MemoryPreferences, NativePicker, PickerRequest, PreferenceStore,
    SecurityScopeApi, SimulatedPicker, SimulatedPlatform, UiContext,
};
pub use storage::{CreationCollisionOption, ItemProperties, NameCollisionOption, StorageItem};
pub use vfs::{FileSystem, LocalFS, MemFS, SandboxedFs};

/*!
 * Sandbox Broker
 *
 * Facade over bookmarks, scope acquisition and the storage substrate. Every
 * storage operation runs as acquire, substrate call, release; failures are
 * settled by the item's access denial response.
 */

use crate::access::{
    AccessDenialResponse, AccessScopeManager, AuditLogger, PolicySettings, RecoveryFlow,
    ScopeHandle,
};
use crate::bookmarks::{Bookmark, BookmarkRecord, BookmarkResolver, BookmarkStore};
use crate::config::BrokerConfig;
use crate::core::{AccessMode, BrokerError, BrokerResult};
use crate::monitoring::{span_operation, MetricsCollector};
use crate::platform::{
    FilePreferences, MemoryPreferences, NativePicker, PreferenceStore, SecurityScopeApi,
    UiContext,
};
use crate::storage::StorageItem;
use crate::vfs::{FileSystem, FileType, VfsError, VfsResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

struct BrokerInner {
    config: BrokerConfig,
    filesystem: Arc<dyn FileSystem>,
    resolver: Arc<BookmarkResolver>,
    access: AccessScopeManager,
    policy: Arc<PolicySettings>,
    metrics: Arc<MetricsCollector>,
    audit: Arc<AuditLogger>,
}

/// Entry point for sandboxed storage access
///
/// Cheap to clone; clones share bookmarks, policy and metrics.
#[derive(Clone)]
pub struct SandboxBroker {
    inner: Arc<BrokerInner>,
}

/// Builder for SandboxBroker
pub struct SandboxBrokerBuilder {
    config: BrokerConfig,
    platform: Option<Arc<dyn SecurityScopeApi>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    filesystem: Option<Arc<dyn FileSystem>>,
    picker: Option<Arc<dyn NativePicker>>,
    ui: Option<UiContext>,
}

impl SandboxBrokerBuilder {
    pub fn new() -> Self {
        Self {
            config: BrokerConfig::default(),
            platform: None,
            preferences: None,
            filesystem: None,
            picker: None,
            ui: None,
        }
    }

    pub fn with_config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Token API (required)
    pub fn platform(mut self, platform: Arc<dyn SecurityScopeApi>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Preference storage; defaults to the configured file or memory
    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Filesystem the storage operations run against (required)
    pub fn filesystem(mut self, filesystem: Arc<dyn FileSystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    /// Picker used by access recovery (required)
    pub fn picker(mut self, picker: Arc<dyn NativePicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// UI context the picker runs on; a new UI thread when unset
    pub fn ui(mut self, ui: UiContext) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn build(self) -> BrokerResult<SandboxBroker> {
        self.config.validate()?;

        let platform = self
            .platform
            .ok_or_else(|| BrokerError::Config("a platform token API is required".into()))?;
        let filesystem = self
            .filesystem
            .ok_or_else(|| BrokerError::Config("a filesystem is required".into()))?;
        let picker = self
            .picker
            .ok_or_else(|| BrokerError::Config("a picker is required".into()))?;

        let preferences: Arc<dyn PreferenceStore> = match (self.preferences, &self.config.preferences_path) {
            (Some(preferences), _) => preferences,
            (None, Some(path)) => Arc::new(FilePreferences::open(path)?),
            (None, None) => Arc::new(MemoryPreferences::new()),
        };
        let ui = match self.ui {
            Some(ui) => ui,
            None => UiContext::spawn()?,
        };

        let metrics = Arc::new(MetricsCollector::new());
        let audit = Arc::new(AuditLogger::with_capacity(self.config.audit_capacity));
        let policy = Arc::new(PolicySettings::new(
            self.config.default_policy,
            self.config.recovery_fallback,
        )?);

        let store = Arc::new(BookmarkStore::new(preferences, self.config.bookmarks_key.clone()));
        let resolver = Arc::new(BookmarkResolver::new(platform.clone(), store, metrics.clone()));
        let recovery = Arc::new(RecoveryFlow::new(picker, ui, resolver.clone(), metrics.clone()));
        let access = AccessScopeManager::new(
            platform,
            resolver.clone(),
            filesystem.clone(),
            policy.clone(),
            recovery,
            metrics.clone(),
            audit.clone(),
        );

        info!(
            filesystem = filesystem.name(),
            default_policy = %self.config.default_policy,
            bookmarks = resolver.store().len(),
            "sandbox broker ready"
        );

        Ok(SandboxBroker {
            inner: Arc::new(BrokerInner {
                config: self.config,
                filesystem,
                resolver,
                access,
                policy,
                metrics,
                audit,
            }),
        })
    }
}

impl Default for SandboxBrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxBroker {
    pub fn builder() -> SandboxBrokerBuilder {
        SandboxBrokerBuilder::new()
    }

    /// Acquire access to `item` for `mode`
    ///
    /// `Ok(None)` is a silent denial. The returned handle disables the scope
    /// when dropped.
    pub async fn acquire_scope(
        &self,
        item: &mut StorageItem,
        mode: AccessMode,
    ) -> BrokerResult<Option<ScopeHandle>> {
        self.inner.access.acquire(item, mode).await
    }

    /// Acquire access for an item that may already be covered by `outer`
    pub async fn acquire_nested(
        &self,
        item: &mut StorageItem,
        mode: AccessMode,
        outer: &ScopeHandle,
    ) -> BrokerResult<Option<ScopeHandle>> {
        self.inner.access.acquire_nested(item, mode, outer).await
    }

    /// Run `f` against the filesystem while a scope for `item` is held
    ///
    /// The scope is released before the result is settled. A substrate
    /// failure raises or comes back as `Ok(None)` depending on the item's
    /// policy.
    pub async fn with_scope<T, F>(
        &self,
        item: &mut StorageItem,
        mode: AccessMode,
        operation: &'static str,
        f: F,
    ) -> BrokerResult<Option<T>>
    where
        F: FnOnce(&dyn FileSystem, &Path) -> VfsResult<T> + Send,
        T: Send,
    {
        let span = span_operation(operation, item.path());
        let Some(scope) = self.acquire_scope(item, mode).await? else {
            span.denied();
            return Ok(None);
        };

        let result = {
            let _entered = span.enter();
            f(self.inner.filesystem.as_ref(), item.path())
        };
        drop(scope);

        match result {
            Ok(value) => {
                span.succeeded();
                Ok(Some(value))
            }
            Err(e) => {
                span.failed(&e);
                self.settle_failure(item, e)
            }
        }
    }

    /// Outcome of a substrate failure that happened with access granted
    pub(crate) fn settle_failure<T>(
        &self,
        item: &StorageItem,
        error: VfsError,
    ) -> BrokerResult<Option<T>> {
        let policy = match self.effective_policy(item) {
            AccessDenialResponse::RequestAccess => self.inner.policy.recovery_fallback(),
            other => other,
        };
        warn!(path = %item.path().display(), %policy, error = %error, "storage operation failed");
        if policy == AccessDenialResponse::Silent {
            return Ok(None);
        }
        Err(BrokerError::storage(item.path(), error))
    }

    /// Existing bookmark for `path`, or a new persisted one
    pub fn get_or_create_bookmark(&self, path: impl AsRef<Path>) -> Option<Bookmark> {
        self.inner.resolver.get_or_create_bookmark(path.as_ref())
    }

    /// Drop the persisted bookmark for `path`
    pub fn forget_bookmark(&self, path: impl AsRef<Path>) -> BrokerResult<bool> {
        self.inner.resolver.forget(path.as_ref())
    }

    /// Persisted bookmarks in key order
    pub fn bookmarks(&self) -> Vec<BookmarkRecord> {
        self.inner.resolver.store().records()
    }

    pub fn set_access_denial_response(&self, item: &mut StorageItem, policy: AccessDenialResponse) {
        item.set_policy(policy);
    }

    /// Change the broker-wide default; later resolutions see the new value
    pub fn set_global_default_policy(&self, policy: AccessDenialResponse) -> BrokerResult<()> {
        self.inner.policy.set_global_default(policy)
    }

    pub fn global_default_policy(&self) -> AccessDenialResponse {
        self.inner.policy.global_default()
    }

    /// Policy that applies to `item` right now
    pub fn effective_policy(&self, item: &StorageItem) -> AccessDenialResponse {
        self.inner.policy.effective(item.policy())
    }

    /// File item at `path`; nothing is checked on disk
    pub fn file(&self, path: impl AsRef<Path>) -> StorageItem {
        StorageItem::file(path)
    }

    /// Folder item at `path`; nothing is checked on disk
    pub fn folder(&self, path: impl AsRef<Path>) -> StorageItem {
        StorageItem::folder(path)
    }

    /// File at `path` if one exists there
    ///
    /// Probing existence needs no scope.
    pub fn file_from_path(&self, path: impl AsRef<Path>) -> Option<StorageItem> {
        match self.inner.filesystem.file_type(path.as_ref()) {
            Some(FileType::Directory) | None => None,
            Some(_) => Some(StorageItem::file(path)),
        }
    }

    /// Folder at `path` if one exists there
    pub fn folder_from_path(&self, path: impl AsRef<Path>) -> Option<StorageItem> {
        match self.inner.filesystem.file_type(path.as_ref()) {
            Some(FileType::Directory) => Some(StorageItem::folder(path)),
            _ => None,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.inner.metrics
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.inner.audit
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.inner.filesystem
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    pub(crate) fn resolver(&self) -> &Arc<BookmarkResolver> {
        &self.inner.resolver
    }
}

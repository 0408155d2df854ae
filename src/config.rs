/*!
 * Broker Configuration
 * Policy defaults, persistence key and backend locations
 */

use crate::access::AccessDenialResponse;
use crate::core::limits::{BOOKMARKS_KEY, MAX_AUDIT_EVENTS};
use crate::core::{BrokerError, BrokerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_DEFAULT_POLICY: &str = "SANDBOX_DEFAULT_POLICY";
pub const ENV_RECOVERY_FALLBACK: &str = "SANDBOX_RECOVERY_FALLBACK";
pub const ENV_BOOKMARKS_KEY: &str = "SANDBOX_BOOKMARKS_KEY";
pub const ENV_PREFERENCES_PATH: &str = "SANDBOX_PREFERENCES_PATH";
pub const ENV_STORAGE_ROOT: &str = "SANDBOX_STORAGE_ROOT";
pub const ENV_AUDIT_CAPACITY: &str = "SANDBOX_AUDIT_CAPACITY";

/// Settings a broker is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Policy applied to items that defer to the global default
    pub default_policy: AccessDenialResponse,
    /// What a declined recovery degrades to
    pub recovery_fallback: AccessDenialResponse,
    /// Preference key holding the bookmark dictionary
    pub bookmarks_key: String,
    /// JSON preference file; in-memory preferences when unset
    pub preferences_path: Option<PathBuf>,
    /// Root of the local filesystem backend
    pub storage_root: PathBuf,
    pub audit_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_policy: AccessDenialResponse::Exception,
            recovery_fallback: AccessDenialResponse::Exception,
            bookmarks_key: BOOKMARKS_KEY.to_string(),
            preferences_path: None,
            storage_root: PathBuf::from("."),
            audit_capacity: MAX_AUDIT_EVENTS,
        }
    }
}

impl BrokerConfig {
    /// Defaults overridden by `SANDBOX_*` environment variables
    pub fn from_env() -> BrokerResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_DEFAULT_POLICY) {
            config.default_policy = AccessDenialResponse::from_str(&value)?;
        }
        if let Ok(value) = std::env::var(ENV_RECOVERY_FALLBACK) {
            config.recovery_fallback = AccessDenialResponse::from_str(&value)?;
        }
        if let Ok(value) = std::env::var(ENV_BOOKMARKS_KEY) {
            config.bookmarks_key = value;
        }
        if let Ok(value) = std::env::var(ENV_PREFERENCES_PATH) {
            config.preferences_path = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var(ENV_STORAGE_ROOT) {
            config.storage_root = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var(ENV_AUDIT_CAPACITY) {
            config.audit_capacity = value.parse().map_err(|_| {
                BrokerError::Config(format!("{} must be a number, got {:?}", ENV_AUDIT_CAPACITY, value))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON document; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> BrokerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| BrokerError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_slice(&raw)
            .map_err(|e| BrokerError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BrokerResult<()> {
        if !self.default_policy.is_terminal() {
            return Err(BrokerError::Config(
                "default_policy cannot be global_default".into(),
            ));
        }
        if !matches!(
            self.recovery_fallback,
            AccessDenialResponse::Exception | AccessDenialResponse::Silent
        ) {
            return Err(BrokerError::Config(format!(
                "recovery_fallback must be exception or silent, got {}",
                self.recovery_fallback
            )));
        }
        if self.bookmarks_key.is_empty() {
            return Err(BrokerError::Config("bookmarks_key is empty".into()));
        }
        if self.audit_capacity == 0 {
            return Err(BrokerError::Config("audit_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn with_default_policy(mut self, policy: AccessDenialResponse) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_recovery_fallback(mut self, policy: AccessDenialResponse) -> Self {
        self.recovery_fallback = policy;
        self
    }

    pub fn with_bookmarks_key(mut self, key: impl Into<String>) -> Self {
        self.bookmarks_key = key.into();
        self
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }
}

/*!
 * Access Denial Policy
 * What happens when a scope cannot be acquired
 */

use crate::core::{BrokerError, BrokerResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Per-item choice of how a denial surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenialResponse {
    /// Raise the denial as an error
    Exception,
    /// Report failure through an empty result
    Silent,
    /// Ask the user to grant access, then retry once
    RequestAccess,
    /// Defer to the broker's global default
    #[default]
    GlobalDefault,
}

impl AccessDenialResponse {
    /// False only for `GlobalDefault`, which needs resolving first
    pub fn is_terminal(self) -> bool {
        !matches!(self, AccessDenialResponse::GlobalDefault)
    }
}

impl fmt::Display for AccessDenialResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessDenialResponse::Exception => "exception",
            AccessDenialResponse::Silent => "silent",
            AccessDenialResponse::RequestAccess => "request_access",
            AccessDenialResponse::GlobalDefault => "global_default",
        };
        f.write_str(name)
    }
}

impl FromStr for AccessDenialResponse {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "exception" => Ok(AccessDenialResponse::Exception),
            "silent" => Ok(AccessDenialResponse::Silent),
            "request_access" => Ok(AccessDenialResponse::RequestAccess),
            "global_default" => Ok(AccessDenialResponse::GlobalDefault),
            other => Err(BrokerError::Config(format!(
                "unknown access denial response {:?}",
                other
            ))),
        }
    }
}

/// Broker-wide policy values
///
/// The global default is owned by the broker instance. Changing it only
/// affects resolutions that happen afterwards.
#[derive(Debug)]
pub struct PolicySettings {
    global_default: RwLock<AccessDenialResponse>,
    recovery_fallback: AccessDenialResponse,
}

impl PolicySettings {
    pub fn new(
        global_default: AccessDenialResponse,
        recovery_fallback: AccessDenialResponse,
    ) -> BrokerResult<Self> {
        Self::check_default(global_default)?;
        if !matches!(
            recovery_fallback,
            AccessDenialResponse::Exception | AccessDenialResponse::Silent
        ) {
            return Err(BrokerError::Config(format!(
                "recovery fallback must be exception or silent, got {}",
                recovery_fallback
            )));
        }

        Ok(Self {
            global_default: RwLock::new(global_default),
            recovery_fallback,
        })
    }

    fn check_default(policy: AccessDenialResponse) -> BrokerResult<()> {
        if policy.is_terminal() {
            Ok(())
        } else {
            Err(BrokerError::Config(
                "the global default cannot itself be global_default".into(),
            ))
        }
    }

    pub fn global_default(&self) -> AccessDenialResponse {
        *self.global_default.read()
    }

    pub fn set_global_default(&self, policy: AccessDenialResponse) -> BrokerResult<()> {
        Self::check_default(policy)?;
        let previous = std::mem::replace(&mut *self.global_default.write(), policy);
        info!(%previous, current = %policy, "global access denial response changed");
        Ok(())
    }

    /// Policy that actually applies to an item with `item_policy`
    pub fn effective(&self, item_policy: AccessDenialResponse) -> AccessDenialResponse {
        match item_policy {
            AccessDenialResponse::GlobalDefault => self.global_default(),
            policy => policy,
        }
    }

    /// What a declined or failed recovery degrades to
    pub fn recovery_fallback(&self) -> AccessDenialResponse {
        self.recovery_fallback
    }
}

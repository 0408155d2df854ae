/*!
 * Name Patterns
 * Wildcard filters for folder listings
 */

use crate::core::{BrokerError, BrokerResult};
use globset::{Glob, GlobMatcher};

/// Compiled `*`/`?` wildcard matched against entry names
#[derive(Debug, Clone)]
pub struct NamePattern {
    matcher: Option<GlobMatcher>,
}

impl NamePattern {
    /// Pattern matching every name
    pub fn any() -> Self {
        Self { matcher: None }
    }

    pub fn new(pattern: &str) -> BrokerResult<Self> {
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self::any());
        }
        if pattern.contains('/') {
            return Err(BrokerError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "patterns match names, not paths".into(),
            });
        }
        let glob = Glob::new(pattern).map_err(|e| BrokerError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            matcher: Some(glob.compile_matcher()),
        })
    }

    /// `None` means match everything
    pub fn from_option(pattern: Option<&str>) -> BrokerResult<Self> {
        pattern.map(Self::new).unwrap_or_else(|| Ok(Self::any()))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher
            .as_ref()
            .map(|m| m.is_match(name))
            .unwrap_or(true)
    }
}

/*!
 * Broker Limits and Constants
 *
 * Centralized location for the broker's keys, thresholds, and magic numbers.
 * Organized by domain so related values stay together.
 */

use std::time::Duration;

// =============================================================================
// BOOKMARK PERSISTENCE
// =============================================================================

/// Preference key holding the serialized bookmark dictionary
pub const BOOKMARKS_KEY: &str = "Bookmarks";

/// Prefix of every token minted by the simulated platform
pub const SIMULATED_TOKEN_MAGIC: &[u8; 4] = b"SSBK";

// =============================================================================
// STORAGE OPERATIONS
// =============================================================================

/// Upper bound (exclusive) on the `name (n).ext` suffix tried when generating
/// a unique name inside a folder
pub const MAX_UNIQUE_NAME_ATTEMPTS: u32 = 100;

/// Prompt shown by the picker during access recovery, followed by the item name
pub const RECOVERY_PROMPT_PREFIX: &str = "Grant access to";

// =============================================================================
// AUDIT & MONITORING
// =============================================================================

/// Events kept in the global audit ring buffer
pub const MAX_AUDIT_EVENTS: usize = 1000;

/// Events kept per path in the audit log
pub const MAX_AUDIT_EVENTS_PER_PATH: usize = 100;

/// Operations slower than this are logged at warn level
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);

/// Name given to the dedicated UI thread
pub const UI_THREAD_NAME: &str = "sandbox-ui";

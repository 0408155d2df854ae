/*!
 * Access Module
 * Scope acquisition, denial policy, recovery and audit
 */

pub mod audit;
pub mod manager;
pub mod policy;
pub mod recovery;
pub mod scope;

pub use audit::{AuditEvent, AuditLogger, AuditOutcome, AuditSeverity, AuditStats};
pub use manager::AccessScopeManager;
pub use policy::{AccessDenialResponse, PolicySettings};
pub use recovery::RecoveryFlow;
pub use scope::{ScopeHandle, ScopeLocks};

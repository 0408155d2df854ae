/*!
 * Guard Traits
 */

use super::{GuardError, GuardMetadata, GuardResult};

/// A held resource with a single release obligation
pub trait Guard: Send {
    fn metadata(&self) -> &GuardMetadata;

    fn is_active(&self) -> bool;

    /// Discharge the obligation now
    ///
    /// `Err(AlreadyReleased)` when it was already discharged.
    fn release(&mut self) -> GuardResult<()>;
}

/// Drop-time release; implementations must log rather than panic
pub trait GuardDrop: Guard {
    fn on_drop(&mut self);
}

/// Lifecycle events of a guard
pub trait Observable: Guard {
    fn on_acquired(&self);

    fn on_released(&self);

    fn on_release_failed(&self, error: &GuardError);
}

/*!
 * Release Guards
 *
 * A guard carries one release obligation. It is discharged exactly once:
 * through an explicit `release`, or by the drop of a guard still held.
 * A second release is reported, never repeated.
 */

mod traits;

pub use traits::{Guard, GuardDrop, Observable};

use std::time::{Duration, Instant};

pub type GuardResult<T> = Result<T, GuardError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Guard was already released")]
    AlreadyReleased,
}

/// What a guard holds and since when
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub kind: &'static str,
    pub label: String,
    pub acquired_at: Instant,
}

impl GuardMetadata {
    pub fn new(kind: &'static str, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            acquired_at: Instant::now(),
        }
    }

    #[inline]
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/*!
 * UI Context
 * Dedicated thread that runs UI work such as pickers
 */

use crate::core::limits::UI_THREAD_NAME;
use crate::core::{PlatformError, PlatformResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, error};

type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the UI thread
///
/// Work submitted through [`UiContext::run`] executes on that thread in
/// submission order; the caller suspends until it finishes. Dropping every
/// handle shuts the thread down.
#[derive(Clone)]
pub struct UiContext {
    sender: flume::Sender<UiTask>,
}

impl UiContext {
    /// Start the UI thread
    pub fn spawn() -> PlatformResult<Self> {
        let (sender, receiver) = flume::unbounded::<UiTask>();

        thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                for task in receiver.iter() {
                    if catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!("UI task panicked");
                    }
                }
                debug!("UI thread exiting");
            })
            .map_err(|e| {
                error!(error = %e, "failed to start UI thread");
                PlatformError::UiUnavailable
            })?;

        Ok(Self { sender })
    }

    /// Run `f` on the UI thread and wait for its result
    pub async fn run<F, R>(&self, f: F) -> PlatformResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Box::new(move || {
                let _ = tx.send(f());
            }))
            .map_err(|_| PlatformError::UiUnavailable)?;

        rx.await.map_err(|_| PlatformError::UiUnavailable)
    }
}

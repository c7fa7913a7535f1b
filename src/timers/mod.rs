//! Delayed actions for transient prompts
//!
//! An [`Expiry`] runs an async action once its delay has passed, on its
//! own tokio task, so the caller never waits on it. Cancelling or
//! dropping the handle before the deadline stops the action.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a scheduled one-shot action
#[derive(Debug)]
pub struct Expiry {
    handle: Option<JoinHandle<()>>,
}

impl Expiry {
    /// Run `action` after `after` has elapsed
    pub fn schedule<F, Fut>(after: Duration, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            action().await;
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop the action. Returns true if it had not run yet.
    pub fn cancel(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                if pending {
                    debug!("Cancelled pending expiry");
                }
                pending
            }
            None => false,
        }
    }

    /// Whether the action has already run (or been aborted)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Let the action run even after this handle is dropped
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for Expiry {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

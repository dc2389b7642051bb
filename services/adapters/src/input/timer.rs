//! Cancellable scheduled tasks for keepalive and reconnect timers
//!
//! A timer that fires at the same moment it is cancelled must not act after
//! cancellation has returned. Each task takes a shared gate before running
//! its action; [`ScheduledTask::cancel`] takes the same gate, flips it and
//! aborts the task. Whichever side wins the gate decides the outcome:
//!
//! - timer first: the action runs to completion, then `cancel` proceeds
//! - cancel first: the timer sees the flag and exits without acting
//!
//! Never call `cancel` from inside the task's own action; it would wait on
//! the gate the action is holding.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One-shot or periodic timer with race-free cancellation
#[derive(Debug)]
pub struct ScheduledTask {
    cancelled: Arc<Mutex<bool>>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `action` once after `delay`
    pub fn once<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(Mutex::new(false));
        let gate = cancelled.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let guard = gate.lock().await;
            if *guard {
                return;
            }
            action().await;
            drop(guard);
        });

        Self { cancelled, handle }
    }

    /// Run `action` every `period`, first run one period from now
    pub fn every<F, Fut>(period: Duration, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(Mutex::new(false));
        let gate = cancelled.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let guard = gate.lock().await;
                if *guard {
                    return;
                }
                action().await;
                drop(guard);
            }
        });

        Self { cancelled, handle }
    }

    /// Cancel the timer, waiting out an action already in flight.
    ///
    /// Once this returns the action will not start again. Idempotent.
    pub async fn cancel(&self) {
        let mut cancelled = self.cancelled.lock().await;
        *cancelled = true;
        self.handle.abort();
    }

    /// Task has exited (fired once, or been cancelled)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

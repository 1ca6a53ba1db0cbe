//! Deferred reset that runs on every exit path of an activation

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Delay between a terminal state and the return to `Armed`.
pub const RESET_DELAY: Duration = Duration::from_secs(3);

type ResetFn = Box<dyn FnOnce() + Send + 'static>;

/// Schedules `reset` to run `delay` after the guard is dropped.
///
/// The guard is armed on entry to `Submitting` and lives until the activation
/// finishes, so success, failure, early `?` returns, panics and a dropped
/// activation future all schedule the reset.
pub struct ResetGuard {
    reset: Option<ResetFn>,
    delay: Duration,
    handle: Option<Handle>,
}

impl ResetGuard {
    pub fn arm(delay: Duration, reset: impl FnOnce() + Send + 'static) -> Self {
        Self {
            reset: Some(Box::new(reset)),
            delay,
            handle: Handle::try_current().ok(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl std::fmt::Debug for ResetGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetGuard")
            .field("delay", &self.delay)
            .field("pending", &self.reset.is_some())
            .finish()
    }
}

impl Drop for ResetGuard {
    fn drop(&mut self) {
        let Some(reset) = self.reset.take() else {
            return;
        };
        let delay = self.delay;
        match &self.handle {
            Some(handle) => {
                debug!(delay_ms = delay.as_millis() as u64, "Reset scheduled");
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    reset();
                });
            }
            None => {
                warn!("No runtime available for delayed reset; resetting immediately");
                reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn fires_once_delay_after_drop() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let guard = ResetGuard::arm(RESET_DELAY, move || flag.store(true, Ordering::SeqCst));

        sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst), "reset must wait for the guard to drop");

        let dropped_at = Instant::now();
        drop(guard);
        sleep(Duration::from_millis(2_999)).await;
        assert!(!fired.load(Ordering::SeqCst));
        sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(dropped_at.elapsed(), RESET_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_when_scope_unwinds() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let task = tokio::spawn(async move {
            let _guard = ResetGuard::arm(RESET_DELAY, move || flag.store(true, Ordering::SeqCst));
            panic!("notification blew up");
        });
        assert!(task.await.unwrap_err().is_panic());

        sleep(RESET_DELAY).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
    }
}

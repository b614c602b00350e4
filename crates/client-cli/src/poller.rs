//! Visibility-aware polling loop for the suggestion list.
//!
//! One spawned task per poller; the handle aborts it on drop, so holding a
//! poller in a single slot (see `Suggestions::start_polling`) guarantees
//! re-starts never stack timers. The tick interval shortens while
//! suggestions are present and stretches when the list is empty; ticks are
//! skipped while hidden, and regaining visibility refetches immediately.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Refetch interval while at least one suggestion is visible.
pub const ACTIVE_INTERVAL: Duration = Duration::from_secs(30);
/// Refetch interval while the list is empty.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(90);

pub fn next_interval(has_suggestions: bool) -> Duration {
    if has_suggestions {
        ACTIVE_INTERVAL
    } else {
        IDLE_INTERVAL
    }
}

/// Visibility flag channel, the `document.visibilitychange` analog. The
/// sender side belongs to whatever hosts the UI; dropping it stops the
/// poller loop.
pub fn visibility_channel(visible: bool) -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(visible)
}

pub struct SuggestionPoller {
    handle: JoinHandle<()>,
}

impl SuggestionPoller {
    /// `refetch` returns whether suggestions are present, which drives the
    /// next interval. `initial_has` seeds that state from whatever is
    /// already cached.
    pub fn spawn<F, Fut>(
        mut visibility: watch::Receiver<bool>,
        initial_has: bool,
        mut refetch: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut has_suggestions = initial_has;
            loop {
                let interval = next_interval(has_suggestions);
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if *visibility.borrow() {
                            has_suggestions = refetch().await;
                        }
                    }
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            // Visibility source is gone; nothing will ever
                            // unhide us again.
                            break;
                        }
                        if *visibility.borrow() {
                            has_suggestions = refetch().await;
                        }
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SuggestionPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

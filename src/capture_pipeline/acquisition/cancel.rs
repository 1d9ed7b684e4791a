use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Granularity at which sleeps notice a cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative stop signal shared between the interrupt handler and the capture loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early if the token is cancelled.
    ///
    /// Returns `true` when the token was cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}

/// Routes Ctrl+C to `token`. Only the first call installs a handler.
pub fn install_interrupt_handler(token: &CancellationToken) {
    static CTRL_HANDLER: Once = Once::new();

    let handler_token = token.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler(move || {
            debug!("Interrupt received");
            handler_token.cancel();
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_runs_full_duration() {
        let token = CancellationToken::new();
        let start = Instant::now();

        assert!(!token.sleep(Duration::from_millis(60)));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_cancelled_token_skips_sleep() {
        let token = CancellationToken::new();
        token.clone().cancel();
        let start = Instant::now();

        assert!(token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_from_another_thread_wakes_sleep() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_zero_sleep_reports_state() {
        let token = CancellationToken::new();
        assert!(!token.sleep(Duration::ZERO));
        token.cancel();
        assert!(token.sleep(Duration::ZERO));
    }
}

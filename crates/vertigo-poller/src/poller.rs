//! The polling loop shared by every upstream.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// A subsystem polled on a fixed interval.
///
/// `poll_once` reads the subsystem and writes the outcome into the store.
/// It never fails: upstream errors are logged and counted towards the
/// poller's failure threshold.
pub trait UpstreamPoller: Send + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Read the subsystem once and publish the result.
    fn poll_once(&mut self) -> impl Future<Output = ()> + Send;
}

/// Shortest interval a poller runs at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Run `poller` every `every` on a background task, starting right away.
/// Intervals shorter than [`MIN_POLL_INTERVAL`] are raised to it. Abort
/// the handle to stop it.
pub fn spawn_poller<P: UpstreamPoller>(mut poller: P, every: Duration) -> JoinHandle<()> {
    if every < MIN_POLL_INTERVAL {
        warn!(poller = poller.name(), interval = ?every, "Poll interval too short, raised to the minimum");
    }
    let every = every.max(MIN_POLL_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poller = poller.name(), interval = ?every, "Poller started");
        loop {
            ticker.tick().await;
            poller.poll_once().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(Arc<AtomicUsize>);

    impl UpstreamPoller for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn poll_once(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let handle = spawn_poller(Counting(Arc::clone(&polls)), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        assert!(polls.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_the_interval() {
        let polls = Arc::new(AtomicUsize::new(0));
        let handle = spawn_poller(Counting(Arc::clone(&polls)), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}

//! Consecutive-failure counting.

/// Counts consecutive failures and reports when a channel should be
/// degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCounter {
    threshold: u32,
    failures: u32,
}

impl FailureCounter {
    /// A counter degrading after `threshold` consecutive failures.
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: 0,
        }
    }

    /// Reset after a successful read.
    pub const fn record_success(&mut self) {
        self.failures = 0;
    }

    /// Count a failure. Returns `true` once the threshold is reached; it
    /// keeps returning `true` until the next success.
    pub const fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        self.failures >= self.threshold
    }

    /// Consecutive failures so far.
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}

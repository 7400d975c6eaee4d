//! Fetch ordering and search debouncing
//!
//! Remote fetches may complete in any order. Each facet owns a
//! [`FetchTracker`]; every request carries the [`FetchTicket`] it was issued
//! with and a response is applied only while its ticket is still the latest.
//! Anything issued earlier is stale and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic sequence number attached to one outstanding fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// Per-facet issuer of fetch tickets.
#[derive(Debug, Default)]
pub struct FetchTracker {
    latest: AtomicU64,
}

impl FetchTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn issue(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Supersede every outstanding ticket without starting a fetch.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }
}

/// Single-shot debouncer for typed search text.
///
/// Every keystroke replaces the pending search and restarts the quiet period,
/// so a burst of typing yields at most one request.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    interval: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebouncer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a keystroke at `now`, cancelling any scheduled search.
    pub fn keystroke(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// Drop the pending search, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending search once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.interval);
        if due {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ticket_supersedes_earlier() {
        let tracker = FetchTracker::new();
        let t0 = tracker.issue();
        let t1 = tracker.issue();
        assert!(t1 > t0);
        assert!(!tracker.is_current(t0));
        assert!(tracker.is_current(t1));
    }

    #[test]
    fn invalidate_supersedes_outstanding() {
        let tracker = FetchTracker::new();
        let t = tracker.issue();
        tracker.invalidate();
        assert!(!tracker.is_current(t));
        assert_eq!(tracker.latest(), 2);
    }

    #[test]
    fn debouncer_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(300));
        debouncer.keystroke("n", start);
        debouncer.keystroke("nu", start + Duration::from_millis(100));
        debouncer.keystroke("nul", start + Duration::from_millis(200));

        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("nul".to_string())
        );
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn cancel_drops_pending_search() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(10));
        debouncer.keystroke("x", start);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }
}

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use parking_lot::Mutex;

use super::{LedgerSnapshot, DEFAULT_WINDOW, EVICTION_SLACK};

/// Append-only, time-ordered record of input events.
///
/// The capture thread calls [`record`](Self::record) once per detected
/// input event, at rates up to the hundreds of thousands per second.
/// Readers take a [`LedgerSnapshot`] and do all filtering and
/// arithmetic on their private copy, so the lock is only ever held for
/// an append or a copy of the backing storage, never for a computation.
pub struct ActionLedger {
    window: Duration,
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    /// Timestamps of retained actions, non-decreasing
    actions: VecDeque<Instant>,
    /// Actions recorded this session, unaffected by window eviction
    total: u64,
}

impl ActionLedger {
    /// Create a ledger retaining `window` of trailing history
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// The configured retention window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Append an event at `at`.
    ///
    /// Concurrent producers can take their timestamp before queueing on
    /// the lock, so events may arrive slightly out of order; an event
    /// older than the newest retained one is clamped to it. Ordering
    /// stays non-decreasing and no count is ever lost. Eviction of
    /// stale history is amortized here so the ledger never grows
    /// without bound even if nobody takes snapshots.
    pub fn record(&self, at: Instant) {
        let mut state = self.state.lock();

        let at = match state.actions.back() {
            Some(&last) => at.max(last),
            None => at,
        };

        state.actions.push_back(at);
        state.total += 1;

        let horizon = self.window + EVICTION_SLACK;
        while let Some(&front) = state.actions.front() {
            if at.saturating_duration_since(front) > horizon {
                state.actions.pop_front();
            } else {
                break;
            }
        }
    }

    /// Copy out the retained events as of `now`.
    ///
    /// The lock is held for a clone of the backing storage and the
    /// counter read; trimming to the retention window happens on the
    /// private copy after release.
    pub fn snapshot_at(&self, now: Instant) -> LedgerSnapshot {
        let (actions, total) = {
            let state = self.state.lock();
            (state.actions.clone(), state.total)
        };

        let mut actions: Vec<Instant> = actions.into();
        let stale = actions.partition_point(|&t| now.saturating_duration_since(t) >= self.window);
        if stale > 0 {
            actions.drain(..stale);
        }

        LedgerSnapshot::new(now, total, actions)
    }

    /// Copy out the retained events as of the current instant
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Clear all events and the session counter
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.actions.clear();
        state.total = 0;
    }

    /// Actions recorded this session
    pub fn total(&self) -> u64 {
        self.state.lock().total
    }
}

impl Default for ActionLedger {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_returns_windowed_suffix_in_order() {
        let ledger = ActionLedger::new(Duration::from_secs(60));
        let base = Instant::now();

        for k in 0..=70u64 {
            ledger.record(base + Duration::from_secs(k));
        }

        let now = base + Duration::from_secs(70);
        let snapshot = ledger.snapshot_at(now);

        // Strictly inside the trailing 60s: seconds 11..=70.
        assert_eq!(snapshot.len(), 60);
        assert_eq!(snapshot.total_actions(), 71);
        assert_eq!(snapshot.actions()[0], base + Duration::from_secs(11));
        assert!(snapshot.actions().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_total_survives_eviction() {
        let ledger = ActionLedger::new(Duration::from_secs(1));
        let base = Instant::now();

        for k in 0..100u64 {
            ledger.record(base + Duration::from_millis(k * 10));
        }
        // One far-future event forces the amortized eviction through
        // the whole backlog.
        ledger.record(base + Duration::from_secs(500));

        assert_eq!(ledger.total(), 101);
        let snapshot = ledger.snapshot_at(base + Duration::from_secs(500));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.total_actions(), 101);
    }

    #[test]
    fn test_earlier_timestamp_is_clamped_not_lost() {
        let ledger = ActionLedger::new(Duration::from_secs(60));
        let base = Instant::now();

        ledger.record(base + Duration::from_secs(2));
        ledger.record(base + Duration::from_secs(1));
        ledger.record(base + Duration::from_secs(3));

        let snapshot = ledger.snapshot_at(base + Duration::from_secs(3));
        assert_eq!(snapshot.total_actions(), 3);
        assert_eq!(snapshot.len(), 3);
        // The late arrival is counted at the newest retained time.
        assert_eq!(snapshot.actions()[1], base + Duration::from_secs(2));
        assert!(snapshot.actions().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reset_clears_events_and_counter() {
        let ledger = ActionLedger::new(Duration::from_secs(60));
        let base = Instant::now();

        for k in 0..10u64 {
            ledger.record(base + Duration::from_millis(k));
        }
        ledger.reset();

        assert_eq!(ledger.total(), 0);
        let snapshot = ledger.snapshot_at(base + Duration::from_secs(1));
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_actions(), 0);
    }

    #[test]
    fn test_concurrent_records_and_snapshots_lose_nothing() {
        const THREADS: usize = 4;
        const PER_THREAD: u64 = 10_000;

        let ledger = Arc::new(ActionLedger::new(Duration::from_secs(3600)));

        let writers: Vec<_> = (0..THREADS)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        ledger.record(Instant::now());
                    }
                })
            })
            .collect();

        // Interleave snapshots with the writers and check totals only
        // ever grow.
        let reader = {
            let ledger = ledger.clone();
            thread::spawn(move || {
                let mut last_total = 0;
                for _ in 0..200 {
                    let snapshot = ledger.snapshot();
                    assert!(snapshot.total_actions() >= last_total);
                    assert!(snapshot.len() as u64 <= snapshot.total_actions());
                    last_total = snapshot.total_actions();
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.total_actions(), (THREADS as u64) * PER_THREAD);
        assert_eq!(snapshot.len() as u64, (THREADS as u64) * PER_THREAD);
    }
}

use std::time::{Duration, Instant, SystemTime};

use super::{LedgerSnapshot, Statistics, DEFAULT_WINDOW, RATE_SLICE};

/// Derives [`Statistics`] from a ledger snapshot.
///
/// Pure arithmetic over a privately owned snapshot: no locks, no I/O,
/// no shared state. An empty ledger or a zero-length session is a
/// normal input and yields all-zero statistics.
#[derive(Debug, Clone, Copy)]
pub struct ApmCalculator {
    window: Duration,
}

impl ApmCalculator {
    /// Create a calculator for the given retention window
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The retention window the rolling rate is computed over
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Compute statistics for a session started at `session_start`,
    /// evaluated at `now`
    pub fn compute(
        &self,
        snapshot: &LedgerSnapshot,
        session_start: Instant,
        now: Instant,
    ) -> Statistics {
        let session_duration = now.saturating_duration_since(session_start);
        let session_seconds = session_duration.as_secs_f64();

        let windowed = snapshot.count_within(self.window, now);
        let sliced = snapshot.count_within(RATE_SLICE, now);
        let total = snapshot.total_actions();

        let current_apm = windowed as f64 * 60.0 / self.window.as_secs_f64();

        let average_apm = if session_seconds > 0.0 {
            total as f64 * 60.0 / session_seconds
        } else {
            0.0
        };

        let actions_per_second = sliced as f64 / RATE_SLICE.as_secs_f64();

        Statistics {
            captured_at: SystemTime::now(),
            current_apm,
            average_apm,
            actions_per_second,
            total_actions: total,
            session_duration,
        }
    }
}

impl Default for ApmCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

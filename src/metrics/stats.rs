use std::time::{Duration, SystemTime};
use serde::{Serialize, Deserialize};

/// Derived statistics for one session at a point in time.
///
/// A plain value object: recomputed on every request, never mutated by
/// the engine after it is handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Wall-clock instant the statistics were computed
    pub captured_at: SystemTime,

    /// Rolling rate over the retention window, per minute
    pub current_apm: f64,

    /// Whole-session rate, per minute
    pub average_apm: f64,

    /// Actions counted in the last full second
    pub actions_per_second: f64,

    /// Total actions recorded this session, independent of the window
    pub total_actions: u64,

    /// Elapsed time since the session started
    pub session_duration: Duration,
}

impl Statistics {
    /// Statistics for an idle or just-started session
    pub fn zeroed(captured_at: SystemTime) -> Self {
        Self {
            captured_at,
            current_apm: 0.0,
            average_apm: 0.0,
            actions_per_second: 0.0,
            total_actions: 0,
            session_duration: Duration::ZERO,
        }
    }

    /// Whether every counter and rate is zero
    pub fn is_zeroed(&self) -> bool {
        self.total_actions == 0
            && self.current_apm == 0.0
            && self.average_apm == 0.0
            && self.actions_per_second == 0.0
    }
}

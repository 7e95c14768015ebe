use std::time::{Duration, Instant};

/// Immutable copy of the ledger's retained events at one instant.
///
/// Exclusively owned by the consumer that requested it; everything
/// computed from it needs no further synchronization.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    taken_at: Instant,
    total: u64,
    actions: Vec<Instant>,
}

impl LedgerSnapshot {
    pub(crate) fn new(taken_at: Instant, total: u64, actions: Vec<Instant>) -> Self {
        Self {
            taken_at,
            total,
            actions,
        }
    }

    /// Instant the snapshot was taken
    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    /// Actions recorded this session, including evicted ones
    pub fn total_actions(&self) -> u64 {
        self.total
    }

    /// Retained event timestamps, oldest first
    pub fn actions(&self) -> &[Instant] {
        &self.actions
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no events are retained
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Count events strictly inside the trailing `span` before `now`.
    ///
    /// Walks backwards from the newest event and stops at the first one
    /// outside the span, the cheap path when the span is much smaller
    /// than the retained history.
    pub fn count_within(&self, span: Duration, now: Instant) -> usize {
        self.actions
            .iter()
            .rev()
            .take_while(|&&t| now.saturating_duration_since(t) < span)
            .count()
    }
}

//! Rolling window of the most recent probe outcomes.

use serde::Serialize;
use std::collections::VecDeque;

/// History length used when none is configured.
pub const DEFAULT_HISTORY: usize = 60;

/// Result of one probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "ms", rename_all = "snake_case")]
pub enum Outcome {
    /// Round-trip time in milliseconds.
    Latency(f64),
    Lost,
}

impl Outcome {
    pub fn latency_ms(&self) -> Option<f64> {
        match *self {
            Outcome::Latency(ms) => Some(ms),
            Outcome::Lost => None,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, Outcome::Lost)
    }
}

/// Fixed-capacity ring of outcomes; the oldest entry is dropped on overflow.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    capacity: usize,
    samples: VecDeque<Outcome>,
}

impl SampleWindow {
    /// Create an empty window. Capacity is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(outcome);
    }

    /// Recorded latencies, oldest first. `Lost` entries are skipped.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().filter_map(Outcome::latency_ms)
    }

    /// All outcomes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> + '_ {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<Outcome> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            (0.0f64..5_000.0).prop_map(Outcome::Latency),
            Just(Outcome::Lost),
        ]
    }

    #[test]
    fn values_skip_lost_and_keep_order() {
        let mut win = SampleWindow::new(5);
        win.push(Outcome::Latency(10.0));
        win.push(Outcome::Lost);
        win.push(Outcome::Latency(30.0));

        assert_eq!(win.len(), 3);
        assert_eq!(win.values().collect::<Vec<_>>(), vec![10.0, 30.0]);
        assert_eq!(win.latest(), Some(Outcome::Latency(30.0)));
    }

    #[test]
    fn oldest_is_evicted_at_capacity() {
        let mut win = SampleWindow::new(2);
        win.push(Outcome::Latency(1.0));
        win.push(Outcome::Latency(2.0));
        win.push(Outcome::Lost);

        assert_eq!(win.len(), 2);
        let kept: Vec<_> = win.iter().copied().collect();
        assert_eq!(kept, vec![Outcome::Latency(2.0), Outcome::Lost]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut win = SampleWindow::new(0);
        assert_eq!(win.capacity(), 1);
        win.push(Outcome::Lost);
        win.push(Outcome::Latency(5.0));
        assert_eq!(win.len(), 1);
        assert_eq!(win.latest(), Some(Outcome::Latency(5.0)));
    }

    #[test]
    fn starts_empty() {
        let win = SampleWindow::default();
        assert!(win.is_empty());
        assert_eq!(win.capacity(), DEFAULT_HISTORY);
        assert_eq!(win.latest(), None);
    }

    proptest! {
        #[test]
        fn holds_exactly_the_most_recent_outcomes(
            capacity in 1usize..32,
            pushes in prop::collection::vec(outcome_strategy(), 0..128),
        ) {
            let mut win = SampleWindow::new(capacity);
            for outcome in &pushes {
                win.push(*outcome);
                prop_assert!(win.len() <= capacity);
            }

            let skip = pushes.len().saturating_sub(capacity);
            let expected: Vec<Outcome> = pushes[skip..].to_vec();
            let kept: Vec<Outcome> = win.iter().copied().collect();
            prop_assert_eq!(kept, expected);
        }
    }
}

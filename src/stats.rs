//! Runtime statistics and data structures.
//!
//! [`snapshot`] derives the live statistics from the [`SampleWindow`] and
//! the lifetime [`Counters`]. [`Stats`] owns both for a monitoring session,
//! turns every outcome into a [`CycleReport`] and emits a final [`Summary`].
//! Reports and summaries are serde-serialisable so the formatting layer can
//! dump them directly.

use crate::{
    config::Target,
    monitor::Termination,
    window::{Outcome, SampleWindow},
};
use serde::Serialize;

/// Lifetime probe totals; unaffected by window eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub packets_sent: u64,
    pub packets_lost: u64,
}

impl Counters {
    pub fn record(&mut self, outcome: &Outcome) {
        self.packets_sent += 1;
        if outcome.is_lost() {
            self.packets_lost += 1;
        }
    }

    /// `100 * lost / sent`, or `None` before anything was sent.
    pub fn loss_percentage(&self) -> Option<f64> {
        (self.packets_sent > 0)
            .then(|| 100.0 * self.packets_lost as f64 / self.packets_sent as f64)
    }
}

/// Live statistics for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Most recent outcome in the window.
    pub current: Option<Outcome>,
    pub average_ms: f64,
    pub jitter_ms: f64,
    pub loss_percentage: Option<f64>,
    /// Non-lost samples behind `average_ms` and `jitter_ms`.
    pub samples: usize,
}

/// Compute live statistics. Only non-lost values currently held by the
/// window take part in the average and jitter.
pub fn snapshot(window: &SampleWindow, counters: &Counters) -> Snapshot {
    let values: Vec<f64> = window.values().collect();
    Snapshot {
        current: window.latest(),
        average_ms: mean(&values),
        jitter_ms: sample_stdev(&values),
        loss_percentage: counters.loss_percentage(),
        samples: values.len(),
    }
}

/// Arithmetic mean; 0 for no values.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bessel-corrected standard deviation; 0 for fewer than two values.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    (sq / (values.len() - 1) as f64).sqrt()
}

/// Handed to the reporter once per completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub seq: u64,
    pub target: String,
    pub outcome: Outcome,
    #[serde(flatten)]
    pub counters: Counters,
    pub stats: Snapshot,
}

/// Roll-up of an entire monitoring session.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub target: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub packet_loss: Option<f64>,
    pub min_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    pub termination: Termination,
}

/// Mutable accumulator used during a session.
#[derive(Debug)]
pub struct Stats {
    target: String,
    window: SampleWindow,
    counters: Counters,
    ok: u64,
    total_rtt: f64,
    min_rtt: f64,
    max_rtt: f64,
}

impl Stats {
    /// Create a new accumulator keeping `history` outcomes.
    pub fn new(target: &Target, history: usize) -> Self {
        Self {
            target: target.to_string(),
            window: SampleWindow::new(history),
            counters: Counters::default(),
            ok: 0,
            total_rtt: 0.0,
            min_rtt: f64::MAX,
            max_rtt: 0.0,
        }
    }

    /// Record one completed cycle and obtain a [`CycleReport`] for the reporter.
    pub fn feed(&mut self, outcome: Outcome) -> CycleReport {
        self.window.push(outcome);
        self.counters.record(&outcome);

        if let Outcome::Latency(rtt) = outcome {
            self.ok += 1;
            self.total_rtt += rtt;
            self.min_rtt = self.min_rtt.min(rtt);
            self.max_rtt = self.max_rtt.max(rtt);
        }

        CycleReport {
            seq: self.counters.packets_sent,
            target: self.target.clone(),
            outcome,
            counters: self.counters,
            stats: snapshot(&self.window, &self.counters),
        }
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Produce the final [`Summary`].
    pub fn summary(&self, termination: Termination) -> Summary {
        let has_ok = self.ok > 0;
        Summary {
            target: self.target.clone(),
            counters: self.counters,
            packet_loss: self.counters.loss_percentage(),
            min_duration_ms: if has_ok { self.min_rtt } else { 0.0 },
            avg_duration_ms: if has_ok {
                self.total_rtt / self.ok as f64
            } else {
                0.0
            },
            max_duration_ms: if has_ok { self.max_rtt } else { 0.0 },
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn window_of(capacity: usize, outcomes: &[Outcome]) -> SampleWindow {
        let mut win = SampleWindow::new(capacity);
        for o in outcomes {
            win.push(*o);
        }
        win
    }

    fn counters(sent: u64, lost: u64) -> Counters {
        Counters {
            packets_sent: sent,
            packets_lost: lost,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn identical_values_have_no_jitter() {
        let win = window_of(60, &[Outcome::Latency(100.0); 3]);
        let snap = snapshot(&win, &counters(3, 0));
        assert_eq!(snap.average_ms, 100.0);
        assert_eq!(snap.jitter_ms, 0.0);
        assert_eq!(snap.samples, 3);
    }

    #[test]
    fn jitter_is_bessel_corrected() {
        let win = window_of(60, &[Outcome::Latency(100.0), Outcome::Latency(200.0)]);
        let snap = snapshot(&win, &counters(2, 0));
        assert_eq!(snap.average_ms, 150.0);
        assert!(approx(snap.jitter_ms, 70.71), "{}", snap.jitter_ms);
    }

    #[test]
    fn single_value_has_no_jitter() {
        let win = window_of(60, &[Outcome::Lost, Outcome::Latency(42.0), Outcome::Lost]);
        let snap = snapshot(&win, &counters(3, 2));
        assert_eq!(snap.average_ms, 42.0);
        assert_eq!(snap.jitter_ms, 0.0);
        assert_eq!(snap.current, Some(Outcome::Lost));
    }

    #[test]
    fn loss_percentage_is_exact() {
        assert_eq!(counters(10, 3).loss_percentage(), Some(30.0));
        assert_eq!(counters(0, 0).loss_percentage(), None);
    }

    #[test]
    fn evicted_values_are_ignored() {
        let win = window_of(
            2,
            &[
                Outcome::Latency(1_000.0),
                Outcome::Latency(10.0),
                Outcome::Latency(20.0),
            ],
        );
        let snap = snapshot(&win, &counters(3, 0));
        assert_eq!(snap.average_ms, 15.0);
        assert_eq!(snap.samples, 2);
    }

    #[test]
    fn always_lost_session() {
        let target = Target::new("192.0.2.1", 80);
        let mut stats = Stats::new(&target, 5);
        for n in 1..=8 {
            let report = stats.feed(Outcome::Lost);
            assert_eq!(report.seq, n);
            assert_eq!(report.stats.loss_percentage, Some(100.0));
            assert_eq!(report.stats.average_ms, 0.0);
            assert_eq!(report.stats.jitter_ms, 0.0);
        }
        assert_eq!(stats.window().len(), 5);

        let summary = stats.summary(Termination::Cancelled);
        assert_eq!(summary.counters, counters(8, 8));
        assert_eq!(summary.avg_duration_ms, 0.0);
    }

    #[test]
    fn summary_tracks_lifetime_extremes() {
        let target = Target::new("127.0.0.1", 80);
        let mut stats = Stats::new(&target, 1);
        stats.feed(Outcome::Latency(5.0));
        stats.feed(Outcome::Lost);
        stats.feed(Outcome::Latency(15.0));

        let summary = stats.summary(Termination::Completed);
        assert_eq!(summary.min_duration_ms, 5.0);
        assert_eq!(summary.max_duration_ms, 15.0);
        assert_eq!(summary.avg_duration_ms, 10.0);
        assert!(approx(summary.packet_loss.unwrap(), 33.33));
    }

    #[test]
    fn summary_handles_zero_probes() {
        let stats = Stats::new(&Target::new("127.0.0.1", 80), 60);
        let summary = stats.summary(Termination::Cancelled);
        assert_eq!(summary.counters.packets_sent, 0);
        assert_eq!(summary.packet_loss, None);
    }

    proptest! {
        #[test]
        fn counters_match_outcomes(lost in prop::collection::vec(any::<bool>(), 1..200)) {
            let mut stats = Stats::new(&Target::new("127.0.0.1", 80), 60);
            for &is_lost in &lost {
                stats.feed(if is_lost { Outcome::Lost } else { Outcome::Latency(1.0) });
            }
            let c = stats.counters();
            prop_assert_eq!(c.packets_sent, lost.len() as u64);
            prop_assert_eq!(c.packets_lost, lost.iter().filter(|l| **l).count() as u64);
            prop_assert!(c.packets_lost <= c.packets_sent);
        }
    }
}

//! Fixed-cadence scheduler loop.
//!
//! Each cycle probes once, records the outcome, hands a report to the
//! [`Reporter`] and then sleeps for whatever is left of the interval, so the
//! wall-clock period stays at the configured interval regardless of how long
//! the probe took. A cycle that overruns the interval is followed
//! immediately by the next one; missed slots are never made up.

use crate::{
    config::MonitorConfig,
    formatter::Reporter,
    probe::{FatalProbeError, Probe, ProbeFailure},
    stats::{Stats, Summary},
    window::Outcome,
};
use serde::Serialize;
use std::{fmt, future::Future};
use tokio::time::{Duration, Instant, sleep};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum Termination {
    /// External stop signal (Ctrl-C).
    Cancelled,
    /// The configured probe count was reached.
    Completed,
    /// The probe reported a failure that is not packet loss.
    Fatal(FatalProbeError),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Cancelled => f.write_str("stopped by user"),
            Termination::Completed => f.write_str("probe count reached"),
            Termination::Fatal(e) => write!(f, "fatal probe error: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Stopped(Termination),
}

/// Time left in the current interval; zero once the cycle has overrun.
pub fn remaining_budget(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Owns the probe, the sample window and the counters of one target.
pub struct Monitor<P> {
    config: MonitorConfig,
    probe: P,
    stats: Stats,
    state: State,
}

impl<P: Probe> Monitor<P> {
    pub fn new(config: MonitorConfig, probe: P) -> Self {
        let stats = Stats::new(&config.target, config.history);
        Self {
            config,
            probe,
            stats,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Session roll-up for the given termination reason.
    pub fn summary(&self, termination: Termination) -> Summary {
        self.stats.summary(termination)
    }

    /// Drive cycles until `cancel` resolves, the probe fails fatally or the
    /// probe count is reached.
    ///
    /// `cancel` is checked before every probe and also interrupts an
    /// in-flight probe or the inter-cycle sleep. An interrupted probe does
    /// not count as a cycle.
    pub async fn run<R, C>(&mut self, reporter: &mut R, cancel: C) -> Termination
    where
        R: Reporter + ?Sized,
        C: Future<Output = ()>,
    {
        if let State::Stopped(reason) = &self.state {
            return reason.clone();
        }
        self.state = State::Running;
        let interval = self.config.interval;
        tokio::pin!(cancel);

        tracing::info!(
            dest = %self.config.target,
            interval_ms = interval.as_millis() as u64,
            history = self.config.history,
            "monitor started"
        );

        let termination = loop {
            let started = Instant::now();

            let attempt = tokio::select! {
                biased;
                _ = &mut cancel => break Termination::Cancelled,
                res = self.probe.measure(&self.config.target, interval) => res,
            };

            let outcome = match attempt {
                Ok(ms) => Outcome::Latency(ms),
                Err(ProbeFailure::Lost(reason)) => {
                    tracing::debug!(dest = %self.config.target, %reason, "packet lost");
                    Outcome::Lost
                }
                Err(ProbeFailure::Fatal(e)) => {
                    tracing::warn!(dest = %self.config.target, error = %e, "fatal probe error");
                    break Termination::Fatal(e);
                }
            };

            let report = self.stats.feed(outcome);
            tracing::trace!(seq = report.seq, latency_ms = ?outcome.latency_ms(), "cycle done");
            reporter.cycle(&report);

            if self
                .config
                .count
                .is_some_and(|limit| report.seq >= limit as u64)
            {
                break Termination::Completed;
            }

            let pause = remaining_budget(interval, started.elapsed());
            if pause.is_zero() {
                tracing::debug!(seq = report.seq, "cycle overran interval, not sleeping");
                continue;
            }
            tokio::select! {
                biased;
                _ = &mut cancel => break Termination::Cancelled,
                _ = sleep(pause) => {}
            }
        };

        tracing::info!(reason = %termination, sent = self.stats.counters().packets_sent, "monitor stopped");
        self.state = State::Stopped(termination.clone());
        termination
    }
}

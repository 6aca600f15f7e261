//! Pluggable output layer.
//!
//! Every format renders into a `String` first and prints it afterwards, so
//! the text can be checked without capturing stdout.

use crate::{
    cli::OutputMode,
    stats::{CycleReport, Summary},
    window::Outcome,
};
use serde::Serialize;
use serde_json::to_string;

/// Receives one report per completed cycle and a summary at the end.
pub trait Reporter {
    fn cycle(&mut self, report: &CycleReport);

    fn summary(&mut self, _summary: &Summary) {}
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
const CLEAR: &str = "\x1b[2J\x1b[H";
const RULE: &str = "--------------------------------------------------";

fn fmt_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Latency(ms) => format!("{ms:.2} ms"),
        Outcome::Lost => "lost".into(),
    }
}

fn fmt_loss(loss: Option<f64>) -> String {
    loss.map(|l| format!("{l:.1}%"))
        .unwrap_or_else(|| "n/a".into())
}

fn summary_text(s: &Summary, loss: &str) -> String {
    let mut out = format!(
        "\n--- {} pingmon statistics ---\n{} probes sent, {} lost, {} packet loss",
        s.target, s.counters.packets_sent, s.counters.packets_lost, loss
    );
    if s.counters.packets_sent > s.counters.packets_lost {
        out.push_str(&format!(
            "\nround-trip min/avg/max = {:.2}/{:.2}/{:.2} ms",
            s.min_duration_ms, s.avg_duration_ms, s.max_duration_ms
        ));
    }
    out.push_str(&format!("\n{}", s.termination));
    out
}

/* ---------- Normal text ---------- */

pub struct Normal;

impl Normal {
    pub fn line(r: &CycleReport) -> String {
        format!(
            "seq={} {} - {} | avg={:.2} ms jitter={:.2} ms | loss {} ({}/{})",
            r.seq,
            r.target,
            fmt_outcome(&r.outcome),
            r.stats.average_ms,
            r.stats.jitter_ms,
            fmt_loss(r.stats.loss_percentage),
            r.counters.packets_lost,
            r.counters.packets_sent,
        )
    }
}

impl Reporter for Normal {
    fn cycle(&mut self, r: &CycleReport) {
        println!("{}", Self::line(r));
    }

    fn summary(&mut self, s: &Summary) {
        println!("{}", summary_text(s, &fmt_loss(s.packet_loss)));
    }
}

/* ---------- Full-screen dashboard ---------- */

pub struct Dashboard;

impl Dashboard {
    pub fn screen(r: &CycleReport) -> String {
        let current = match r.outcome {
            Outcome::Latency(ms) => format!("{ms:.2} ms"),
            Outcome::Lost => "PACKET LOST".into(),
        };
        format!(
            "--- pingmon: {} --- (Ctrl-C to quit)\n\
             packets: {} sent, {} lost ({})\n\
             {RULE}\n\
             current : {}\n\
             average : {:.2} ms (last {} replies)\n\
             jitter  : {:.2} ms\n\
             {RULE}",
            r.target,
            r.counters.packets_sent,
            r.counters.packets_lost,
            fmt_loss(r.stats.loss_percentage),
            current,
            r.stats.average_ms,
            r.stats.samples,
            r.stats.jitter_ms,
        )
    }
}

impl Reporter for Dashboard {
    fn cycle(&mut self, r: &CycleReport) {
        print!("{CLEAR}");
        println!("{}", Self::screen(r));
    }

    fn summary(&mut self, s: &Summary) {
        println!("{}", summary_text(s, &fmt_loss(s.packet_loss)));
    }
}

/* ---------- JSON ---------- */

pub struct Json;

impl Json {
    fn emit<T: Serialize>(value: &T) {
        match to_string(value) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "cannot serialise report"),
        }
    }
}

impl Reporter for Json {
    fn cycle(&mut self, r: &CycleReport) {
        Self::emit(r);
    }

    fn summary(&mut self, s: &Summary) {
        Self::emit(s);
    }
}

/* ---------- CSV ---------- */

#[derive(Default)]
pub struct Csv {
    header_done: bool,
}

impl Csv {
    pub const HEADER: &'static str = "seq,target,status,latency_ms,avg_ms,jitter_ms,loss_pct,sent,lost";

    pub fn row(r: &CycleReport) -> String {
        let (status, latency) = match r.outcome {
            Outcome::Latency(ms) => ("ok", format!("{ms:.4}")),
            Outcome::Lost => ("lost", String::new()),
        };
        let loss = r
            .stats
            .loss_percentage
            .map(|l| format!("{l:.2}"))
            .unwrap_or_default();
        format!(
            "{},{},{status},{latency},{:.4},{:.4},{loss},{},{}",
            r.seq,
            r.target,
            r.stats.average_ms,
            r.stats.jitter_ms,
            r.counters.packets_sent,
            r.counters.packets_lost
        )
    }
}

impl Reporter for Csv {
    fn cycle(&mut self, r: &CycleReport) {
        // print header once
        if !std::mem::replace(&mut self.header_done, true) {
            println!("{}", Self::HEADER);
        }
        println!("{}", Self::row(r));
    }

    fn summary(&mut self, s: &Summary) {
        println!("\ntarget,sent,lost,loss_pct,min_ms,avg_ms,max_ms,termination");
        println!(
            "{},{},{},{},{:.4},{:.4},{:.4},{}",
            s.target,
            s.counters.packets_sent,
            s.counters.packets_lost,
            s.packet_loss.map(|l| format!("{l:.2}")).unwrap_or_default(),
            s.min_duration_ms,
            s.avg_duration_ms,
            s.max_duration_ms,
            s.termination
        );
    }
}

/* ---------- ANSI-colored TTY ---------- */

pub struct Color;

impl Reporter for Color {
    fn cycle(&mut self, r: &CycleReport) {
        let color = if r.outcome.is_lost() { RED } else { GREEN };
        println!(
            "seq={} {} - {color}{}{RESET} | avg={:.2} ms jitter={:.2} ms | loss {}",
            r.seq,
            r.target,
            fmt_outcome(&r.outcome),
            r.stats.average_ms,
            r.stats.jitter_ms,
            fmt_loss(r.stats.loss_percentage),
        );
    }

    fn summary(&mut self, s: &Summary) {
        let color = if s.counters.packets_lost == 0 { GREEN } else { RED };
        let loss = format!("{color}{}{RESET}", fmt_loss(s.packet_loss));
        println!("{}", summary_text(s, &loss));
    }
}

/* ---------- Factory ---------- */

pub fn from_mode(mode: OutputMode) -> Box<dyn Reporter> {
    match mode {
        OutputMode::Normal => Box::new(Normal),
        OutputMode::Dashboard => Box::new(Dashboard),
        OutputMode::Json => Box::new(Json),
        OutputMode::Csv => Box::new(Csv::default()),
        OutputMode::Color => Box::new(Color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Target,
        monitor::Termination,
        probe::FatalProbeError,
        stats::Stats,
    };

    fn reports(outcomes: &[Outcome]) -> (Stats, Vec<CycleReport>) {
        let mut stats = Stats::new(&Target::new("127.0.0.1", 443), 60);
        let reports = outcomes.iter().map(|o| stats.feed(*o)).collect();
        (stats, reports)
    }

    #[test]
    fn normal_line_shows_latency_and_loss() {
        let (_, r) = reports(&[Outcome::Latency(12.5), Outcome::Lost]);
        assert_eq!(
            Normal::line(&r[0]),
            "seq=1 127.0.0.1:443 - 12.50 ms | avg=12.50 ms jitter=0.00 ms | loss 0.0% (0/1)"
        );
        assert!(Normal::line(&r[1]).contains("- lost |"));
        assert!(Normal::line(&r[1]).contains("loss 50.0% (1/2)"));
    }

    #[test]
    fn dashboard_marks_lost_packet() {
        let (_, r) = reports(&[Outcome::Latency(100.0), Outcome::Lost]);
        let screen = Dashboard::screen(&r[1]);
        assert!(screen.contains("current : PACKET LOST"));
        assert!(screen.contains("average : 100.00 ms (last 1 replies)"));
        assert!(screen.contains("2 sent, 1 lost (50.0%)"));
    }

    #[test]
    fn csv_row_leaves_lost_latency_empty() {
        let (_, r) = reports(&[Outcome::Lost]);
        assert_eq!(
            Csv::row(&r[0]),
            "1,127.0.0.1:443,lost,,0.0000,0.0000,100.00,1,1"
        );
        assert_eq!(Csv::HEADER.split(',').count(), Csv::row(&r[0]).split(',').count());
    }

    #[test]
    fn json_report_is_tagged() {
        let (_, r) = reports(&[Outcome::Latency(3.0)]);
        let v: serde_json::Value = serde_json::to_value(&r[0]).unwrap();
        assert_eq!(v["outcome"]["status"], "latency");
        assert_eq!(v["outcome"]["ms"], 3.0);
        assert_eq!(v["packets_sent"], 1);
        assert_eq!(v["stats"]["loss_percentage"], 0.0);
    }

    #[test]
    fn summary_names_the_termination() {
        let (stats, _) = reports(&[Outcome::Latency(2.0), Outcome::Latency(4.0)]);
        let text = summary_text(&stats.summary(Termination::Cancelled), "0.0%");
        assert!(text.contains("2 probes sent, 0 lost, 0.0% packet loss"));
        assert!(text.contains("min/avg/max = 2.00/3.00/4.00 ms"));
        assert!(text.ends_with("stopped by user"));

        let fatal = Termination::Fatal(FatalProbeError::new("socket exploded"));
        let v = serde_json::to_value(stats.summary(fatal)).unwrap();
        assert_eq!(v["termination"]["reason"], "fatal");
        assert_eq!(v["termination"]["error"]["message"], "socket exploded");
    }
}

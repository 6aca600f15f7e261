//! Argument parsing layer (clap).

use crate::{
    config::{DEFAULT_PORT, MAX_INTERVAL},
    window::DEFAULT_HISTORY,
};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::time::Duration;

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a target continuously and show live latency statistics
    Monitor(MonitorArgs),

    /// Run the system `ping` once and print its output
    Ping(PingArgs),

    /// Run the system `traceroute` / `tracert` once and print its output
    Trace(TraceArgs),
}

#[derive(ClapArgs, Debug)]
pub struct MonitorArgs {
    /// Target host name or IP address
    #[arg(default_value = "8.8.8.8", env = "PINGMON_HOST")]
    pub host: String,

    /// Target port for `--probe tcp` (`-p`)
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PINGMON_PORT")]
    pub port: u16,

    /// Seconds between probes, also the per-probe timeout (`-i`)
    #[arg(
        short,
        long,
        default_value = "1",
        value_parser = parse_interval,
        env = "PINGMON_INTERVAL"
    )]
    pub interval: Duration,

    /// Samples kept for average and jitter (`-n`)
    #[arg(
        short = 'n',
        long,
        default_value_t = DEFAULT_HISTORY,
        value_parser = parse_at_least_one,
        env = "PINGMON_HISTORY"
    )]
    pub history: usize,

    /// Stop after this many probes; runs until Ctrl-C when omitted (`-c`)
    #[arg(short, long, value_parser = parse_at_least_one)]
    pub count: Option<usize>,

    /// Probe transport
    #[arg(long, value_enum, default_value_t = ProbeKind::Icmp, env = "PINGMON_PROBE")]
    pub probe: ProbeKind,

    /// Output format (`-o`)
    #[arg(
        short = 'o',
        long,
        value_enum,
        default_value_t = OutputMode::Normal,
        help = "normal | dashboard | json | csv | color"
    )]
    pub output_mode: OutputMode,
}

#[derive(ClapArgs, Debug)]
pub struct PingArgs {
    /// Target host name or IP address
    pub host: String,

    /// Echo requests to send (`-c`)
    #[arg(short, long, default_value_t = 4, value_parser = parse_at_least_one)]
    pub count: usize,
}

#[derive(ClapArgs, Debug)]
pub struct TraceArgs {
    /// Target host name or IP address
    pub host: String,
}

/// Supported probe transports.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeKind {
    Icmp,
    Tcp,
}

/// Supported output modes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Normal,
    Dashboard, // full-screen redraw
    Json,
    Csv,
    Color, // ANSI-colored TTY
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if secs.is_nan() || secs <= 0.0 {
        return Err("must be > 0".into());
    }
    if secs > MAX_INTERVAL.as_secs_f64() {
        return Err(format!("must be <= {} seconds", MAX_INTERVAL.as_secs()));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_at_least_one(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be >= 1".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

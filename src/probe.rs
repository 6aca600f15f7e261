//! Probe transports.
//!
//! A [`Probe`] performs exactly one latency measurement and classifies any
//! failure as either [`ProbeFailure::Lost`] (the packet is counted as lost
//! and monitoring goes on) or [`ProbeFailure::Fatal`] (monitoring stops).
//! Unknown transport errors are fatal so a new failure mode is never
//! silently absorbed as packet loss.
//!
//! Sockets and ICMP clients live only inside a single attempt and are
//! released when the attempt future completes or is dropped.

use crate::config::Target;
use serde::Serialize;
use std::{
    fmt,
    future::Future,
    io,
    net::{IpAddr, SocketAddr},
};
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    time::{Duration, Instant, timeout_at},
};

/// Echo payload size, same as the classic `ping` default.
const ICMP_PAYLOAD: [u8; 56] = [0; 56];

/// Cap for attempt deadlines so `now + timeout` can never overflow.
const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Latency in milliseconds, or why there is none.
pub type ProbeResult = Result<f64, ProbeFailure>;

/// Why a transient attempt produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LostReason {
    Timeout,
    Refused,
    Unreachable,
    Resolve,
    Io,
}

impl fmt::Display for LostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LostReason::Timeout => "timed out",
            LostReason::Refused => "connection refused",
            LostReason::Unreachable => "unreachable",
            LostReason::Resolve => "address resolution failed",
            LostReason::Io => "I/O error",
        };
        f.write_str(s)
    }
}

/// A failure that must stop the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct FatalProbeError {
    pub message: String,
    /// Set when running with elevated privileges would likely help.
    pub needs_privilege: bool,
}

impl FatalProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            needs_privilege: false,
        }
    }

    pub fn privileged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            needs_privilege: true,
        }
    }

    /// Operator-facing advice, if any.
    pub fn hint(&self) -> Option<&'static str> {
        self.needs_privilege.then_some(
            "this probe may need elevated privileges: run as root / Administrator, \
             grant CAP_NET_RAW, or use `--probe tcp`",
        )
    }
}

/// Two-way classification of a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("packet lost: {0}")]
    Lost(LostReason),

    #[error("fatal probe error: {0}")]
    Fatal(FatalProbeError),
}

/// One latency measurement against a target.
pub trait Probe {
    /// Measure once. Must resolve within `timeout`, reporting
    /// [`LostReason::Timeout`] otherwise.
    fn measure(
        &mut self,
        target: &Target,
        timeout: Duration,
    ) -> impl Future<Output = ProbeResult>;
}

/// Map an I/O error raised during an attempt.
///
/// Permission and support errors are fatal; everything else that can
/// happen while talking to the network counts as a lost packet.
pub fn classify_io(err: &io::Error) -> ProbeFailure {
    use io::ErrorKind::*;
    match err.kind() {
        PermissionDenied => ProbeFailure::Fatal(FatalProbeError::privileged(format!(
            "permission denied: {err}"
        ))),
        Unsupported | OutOfMemory => ProbeFailure::Fatal(FatalProbeError::new(err.to_string())),
        TimedOut | WouldBlock => ProbeFailure::Lost(LostReason::Timeout),
        ConnectionRefused => ProbeFailure::Lost(LostReason::Refused),
        HostUnreachable | NetworkUnreachable | AddrNotAvailable | NetworkDown => {
            ProbeFailure::Lost(LostReason::Unreachable)
        }
        _ => ProbeFailure::Lost(LostReason::Io),
    }
}

/// Point in time by which an attempt started now must finish.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + MAX_TIMEOUT)
}

/// Resolve `host` to an IP address, preferring a literal.
pub async fn resolve_host(host: &str) -> io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    tokio::net::lookup_host((host, 0))
        .await?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
}

async fn resolve_socket(target: &Target) -> io::Result<SocketAddr> {
    let ip = resolve_host(&target.host).await?;
    Ok(SocketAddr::new(ip, target.port))
}

/* ---------- TCP connect ---------- */

/// Measures the time a TCP `connect()` takes to complete.
#[derive(Debug, Default)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for TcpProbe {
    async fn measure(&mut self, target: &Target, timeout: Duration) -> ProbeResult {
        let deadline = deadline_after(timeout);

        let addr = match timeout_at(deadline, resolve_socket(target)).await {
            Ok(Ok(addr)) => addr,
            Ok(Err(e)) => {
                tracing::debug!(dest = %target, error = %e, "resolution failed");
                return Err(ProbeFailure::Lost(LostReason::Resolve));
            }
            Err(_) => return Err(ProbeFailure::Lost(LostReason::Timeout)),
        };

        let start = Instant::now();
        let res = timeout_at(deadline, TcpStream::connect(addr)).await;
        let rtt_ms = start.elapsed().as_secs_f64() * 1_000.0;

        match res {
            Ok(Ok(_stream)) => Ok(rtt_ms),
            Ok(Err(e)) => {
                tracing::debug!(dest = %addr, error = %e, "connect failed");
                Err(classify_io(&e))
            }
            Err(_) => Err(ProbeFailure::Lost(LostReason::Timeout)),
        }
    }
}

/* ---------- ICMP echo ---------- */

/// Sends one ICMP echo request per attempt.
#[derive(Debug)]
pub struct IcmpProbe {
    ident: u16,
    seq: u16,
}

impl IcmpProbe {
    pub fn new() -> Self {
        Self {
            ident: rand::random(),
            seq: 0,
        }
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_surge(err: SurgeError) -> ProbeFailure {
    match err {
        SurgeError::Timeout { .. } => ProbeFailure::Lost(LostReason::Timeout),
        SurgeError::IOError(e) => classify_io(&e),
        other => ProbeFailure::Fatal(FatalProbeError::new(format!("ICMP error: {other}"))),
    }
}

impl Probe for IcmpProbe {
    async fn measure(&mut self, target: &Target, timeout: Duration) -> ProbeResult {
        let deadline = deadline_after(timeout);

        let ip = match timeout_at(deadline, resolve_host(&target.host)).await {
            Ok(Ok(ip)) => ip,
            Ok(Err(e)) => {
                tracing::debug!(dest = %target, error = %e, "resolution failed");
                return Err(ProbeFailure::Lost(LostReason::Resolve));
            }
            Err(_) => return Err(ProbeFailure::Lost(LostReason::Timeout)),
        };

        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => ProbeFailure::Fatal(FatalProbeError::privileged(
                format!("cannot open ICMP socket: {e}"),
            )),
            _ => ProbeFailure::Fatal(FatalProbeError::new(format!(
                "cannot open ICMP socket: {e}"
            ))),
        })?;

        let seq = self.next_seq();
        let mut pinger = client.pinger(ip, PingIdentifier(self.ident)).await;
        pinger.timeout(deadline.saturating_duration_since(Instant::now()));

        match pinger.ping(PingSequence(seq), &ICMP_PAYLOAD).await {
            Ok((_packet, rtt)) => Ok(rtt.as_secs_f64() * 1_000.0),
            Err(e) => {
                tracing::debug!(dest = %ip, seq, error = %e, "echo failed");
                Err(classify_surge(e))
            }
        }
    }
}

//! Monitor configuration, built once before the probe loop starts.

use crate::{
    cli::MonitorArgs,
    error::ConfigError,
    window::DEFAULT_HISTORY,
};
use serde::Serialize;
use std::{fmt, time::Duration};

/// Default sampling interval (1 second).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Longest accepted sampling interval (24 hours).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default port for connect-based probing.
pub const DEFAULT_PORT: u16 = 443;

/// Probed endpoint. The port is only used by connect-based transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Everything the scheduler loop needs to know.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorConfig {
    pub target: Target,
    /// Sampling period; also the per-probe timeout.
    pub interval: Duration,
    /// Number of outcomes kept for average and jitter.
    pub history: usize,
    /// Stop after this many probes. `None` runs until cancelled.
    pub count: Option<usize>,
}

impl MonitorConfig {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            interval: DEFAULT_INTERVAL,
            history: DEFAULT_HISTORY,
            count: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.target.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval > MAX_INTERVAL {
            return Err(ConfigError::IntervalTooLong {
                max_secs: MAX_INTERVAL.as_secs(),
            });
        }
        if self.history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if self.count == Some(0) {
            return Err(ConfigError::ZeroCount);
        }
        Ok(())
    }
}

impl TryFrom<&MonitorArgs> for MonitorConfig {
    type Error = ConfigError;

    fn try_from(args: &MonitorArgs) -> Result<Self, Self::Error> {
        let config = Self {
            target: Target::new(args.host.trim(), args.port),
            interval: args.interval,
            history: args.history,
            count: args.count,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::new(Target::new("8.8.8.8", DEFAULT_PORT));
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.history, 60);
        assert_eq!(config.count, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let base = MonitorConfig::new(Target::new("localhost", 80));

        let err = base.clone().with_interval(Duration::ZERO).validate();
        assert_eq!(err, Err(ConfigError::ZeroInterval));

        let err = base
            .clone()
            .with_interval(Duration::from_secs(u64::MAX))
            .validate();
        assert_eq!(err, Err(ConfigError::IntervalTooLong { max_secs: 86_400 }));
        assert!(base.clone().with_interval(MAX_INTERVAL).validate().is_ok());

        let err = base.clone().with_history(0).validate();
        assert_eq!(err, Err(ConfigError::ZeroHistory));

        let err = base.clone().with_count(0).validate();
        assert_eq!(err, Err(ConfigError::ZeroCount));

        let err = MonitorConfig::new(Target::new("localhost", 0)).validate();
        assert_eq!(err, Err(ConfigError::ZeroPort));

        let err = MonitorConfig::new(Target::new("  ", 80)).validate();
        assert_eq!(err, Err(ConfigError::EmptyHost));
    }

    #[test]
    fn ipv6_target_is_bracketed() {
        assert_eq!(Target::new("::1", 80).to_string(), "[::1]:80");
        assert_eq!(Target::new("example.com", 80).to_string(), "example.com:80");
    }
}

//! Binary entry point for **pingmon**.
//!
//! * Installs the `tracing` subscriber (stderr, `RUST_LOG`, default `warn`).
//! * Parses CLI arguments.
//! * Runs the engine.
//! * On **Windows**, requests a 1 ms system timer (`timeBeginPeriod`) so the
//!   inter-cycle sleep is not rounded up to the default ~15.6 ms tick.

use clap::Parser;
use pingmon::{cli::Args, engine};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(windows)]
mod win_timer {
    //! Lightweight FFI wrapper for high-resolution sleeps.

    #[link(name = "winmm")]
    unsafe extern "system" {
        fn timeBeginPeriod(period: u32) -> u32;
        fn timeEndPeriod(period: u32) -> u32;
    }

    pub struct HighResTimerGuard {
        period: Option<u32>,
    }

    impl HighResTimerGuard {
        pub fn enable(period: u32) -> Self {
            let ok = unsafe { timeBeginPeriod(period) } == 0;
            Self {
                period: ok.then_some(period),
            }
        }
    }

    impl Drop for HighResTimerGuard {
        fn drop(&mut self) {
            if let Some(period) = self.period {
                unsafe { timeEndPeriod(period) };
            }
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    #[cfg(windows)]
    let _timer_guard = win_timer::HighResTimerGuard::enable(1);

    let args = Args::parse();
    match engine::run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

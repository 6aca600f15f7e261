//! High-level orchestrator: config → resolve → monitor loop → summary.

use crate::{
    cli::{Args, Command, MonitorArgs, OutputMode, ProbeKind},
    config::MonitorConfig,
    error::{MonitorError, Result},
    external::{self, Tool},
    formatter::{self, Reporter},
    monitor::{Monitor, Termination},
    probe::{IcmpProbe, Probe, TcpProbe, resolve_host},
};
use anyhow::Context;
use std::time::Instant;
use tokio::signal;

pub fn run(args: Args) -> Result<i32> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")?;
    rt.block_on(run_async(args))
}

async fn run_async(args: Args) -> Result<i32> {
    match args.command {
        Command::Monitor(m) => monitor(m).await,
        Command::Ping(p) => one_shot(Tool::Ping { count: p.count }, &p.host).await,
        Command::Trace(t) => {
            println!("this may take a few minutes...");
            one_shot(Tool::Traceroute, &t.host).await
        }
    }
}

async fn monitor(args: MonitorArgs) -> Result<i32> {
    let config = MonitorConfig::try_from(&args)?;

    /* address resolution */
    let t0 = Instant::now();
    let ip = resolve_host(&config.target.host)
        .await
        .map_err(|e| MonitorError::Resolve {
            target: config.target.host.clone(),
            reason: e.to_string(),
        })?;
    let resolve_ms = t0.elapsed().as_secs_f64() * 1_000.0;
    tracing::info!(host = %config.target.host, %ip, resolve_ms, "target resolved");

    if matches!(args.output_mode, OutputMode::Normal | OutputMode::Color) {
        let what = match args.probe {
            ProbeKind::Icmp => format!("{ip} (icmp)"),
            ProbeKind::Tcp => format!("{} (tcp)", config.target),
        };
        println!(
            "\n** Monitoring {what} every {:.2}s - Ctrl-C to stop **",
            config.interval.as_secs_f64()
        );
    }

    let mut reporter = formatter::from_mode(args.output_mode);
    let termination = match args.probe {
        ProbeKind::Icmp => drive(config, IcmpProbe::new(), reporter.as_mut()).await,
        ProbeKind::Tcp => drive(config, TcpProbe::new(), reporter.as_mut()).await,
    };

    /* exit code */
    match termination {
        Termination::Fatal(e) => {
            eprintln!("\nfatal probe error: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("hint: {hint}");
            }
            Ok(1)
        }
        Termination::Cancelled | Termination::Completed => Ok(0),
    }
}

async fn drive<P: Probe>(
    config: MonitorConfig,
    probe: P,
    reporter: &mut dyn Reporter,
) -> Termination {
    let mut monitor = Monitor::new(config, probe);
    let termination = monitor.run(&mut *reporter, ctrl_c()).await;
    reporter.summary(&monitor.summary(termination.clone()));
    termination
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn one_shot(tool: Tool, host: &str) -> Result<i32> {
    let out = external::run(tool, host).await?;

    println!("\n--- {} {host} ---", out.program);
    println!("{}", out.stdout);
    if !out.stderr.trim().is_empty() {
        eprintln!("\n--- stderr ---\n{}", out.stderr);
    }

    if out.status.success() {
        Ok(0)
    } else {
        eprintln!("{} exited with {}", out.program, out.status);
        Ok(1)
    }
}

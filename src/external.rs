//! One-shot system `ping` and `traceroute` runs with captured output.
//!
//! These are not part of the monitoring loop: the command runs once, its
//! output is collected and handed back for printing.

use crate::error::{MonitorError, Result};
use std::{io, net::IpAddr, process::ExitStatus};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ping { count: usize },
    Traceroute,
}

/// Output of a finished run.
#[derive(Debug)]
pub struct Captured {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

fn is_ipv6(host: &str) -> bool {
    matches!(host.parse::<IpAddr>(), Ok(IpAddr::V6(_))) || host.contains(':')
}

/// Program name and arguments for `tool` on `platform`.
pub fn command_line(tool: Tool, host: &str, platform: Platform) -> (String, Vec<String>) {
    let mut args = Vec::new();
    let program = match (tool, platform) {
        (Tool::Ping { count }, Platform::Windows) => {
            args.extend(["-n".to_string(), count.to_string()]);
            "ping"
        }
        (Tool::Ping { count }, Platform::Unix) => {
            args.extend(["-c".to_string(), count.to_string()]);
            "ping"
        }
        (Tool::Traceroute, Platform::Windows) => {
            if is_ipv6(host) {
                args.push("-6".into());
            }
            // skip reverse lookups, much faster
            args.push("-d".into());
            "tracert"
        }
        (Tool::Traceroute, Platform::Unix) => {
            if is_ipv6(host) {
                args.push("-6".into());
            }
            "traceroute"
        }
    };
    args.push(host.to_string());
    (program.to_string(), args)
}

#[cfg(windows)]
mod oem {
    //! Console output decoding through the active OEM code page.

    const CP_OEMCP: u32 = 1;

    #[link(name = "kernel32")]
    unsafe extern "system" {
        fn MultiByteToWideChar(
            code_page: u32,
            flags: u32,
            src: *const u8,
            src_len: i32,
            dst: *mut u16,
            dst_len: i32,
        ) -> i32;
    }

    /// `None` when the system cannot convert the bytes.
    pub fn decode(bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return Some(String::new());
        }
        let src_len = i32::try_from(bytes.len()).ok()?;
        // SAFETY: `bytes` is valid for `src_len` bytes; a null destination
        // with length 0 only queries the required size.
        let needed = unsafe {
            MultiByteToWideChar(CP_OEMCP, 0, bytes.as_ptr(), src_len, std::ptr::null_mut(), 0)
        };
        if needed <= 0 {
            return None;
        }
        let mut wide = vec![0u16; needed as usize];
        // SAFETY: `wide` holds exactly `needed` u16 slots.
        let written = unsafe {
            MultiByteToWideChar(CP_OEMCP, 0, bytes.as_ptr(), src_len, wide.as_mut_ptr(), needed)
        };
        if written <= 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&wide[..written as usize]))
    }
}

/// Decode captured console output.
///
/// Windows tools print in the OEM code page rather than UTF-8; elsewhere the
/// output is UTF-8.
pub fn decode_console(bytes: &[u8]) -> String {
    #[cfg(windows)]
    if let Some(text) = oem::decode(bytes) {
        return text;
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Run `tool` once against `host` and capture both output streams.
pub async fn run(tool: Tool, host: &str) -> Result<Captured> {
    let (program, args) = command_line(tool, host, Platform::current());
    tracing::debug!(%program, ?args, "spawning external tool");

    let output = match Command::new(&program).args(&args).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MonitorError::MissingTool(program));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Captured {
        program,
        status: output.status,
        stdout: decode_console(&output.stdout),
        stderr: decode_console(&output.stderr),
    })
}

//! Liveness probing via the system ping utility

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tracing::trace;

/// Capability interface for liveness checks.
///
/// Implementations answer a single question: did `addr` respond to one echo
/// request? A probe that cannot run (missing binary, spawn failure) is
/// indistinguishable from a dead host.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, addr: Ipv4Addr) -> bool;
}

/// Probes by shelling the platform ping with a single packet and a short
/// per-packet timeout. Exit status zero means a reply was received.
pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn check(&self, addr: Ipv4Addr) -> bool {
        let result = ping_command(addr).output().await;
        let alive = matches!(result, Ok(output) if output.status.success());
        trace!(ip = %addr, alive, "Liveness probe");
        alive
    }
}

#[cfg(not(windows))]
fn ping_command(addr: Ipv4Addr) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("ping");
    cmd.args(["-c", "1", "-W", "1", &addr.to_string()]);
    cmd
}

#[cfg(windows)]
fn ping_command(addr: Ipv4Addr) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("ping");
    cmd.args(["-n", "1", "-w", "500", &addr.to_string()]);
    cmd
}

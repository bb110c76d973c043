//! Hardware-address resolution from the OS neighbor table

use async_trait::async_trait;
use lanwatch_core::normalize_hardware_addr;
use std::net::Ipv4Addr;
use tracing::trace;

/// Capability interface for neighbor-table lookups.
///
/// Callers supply an address already confirmed alive; `None` means no
/// hardware address could be extracted and the caller assigns the sentinel.
#[async_trait]
pub trait NeighborTableReader: Send + Sync {
    async fn resolve(&self, addr: Ipv4Addr) -> Option<String>;
}

/// Resolves by shelling the system `arp` utility filtered to the target
/// address and scanning its textual output.
pub struct ArpTableReader;

#[async_trait]
impl NeighborTableReader for ArpTableReader {
    async fn resolve(&self, addr: Ipv4Addr) -> Option<String> {
        let output = arp_command(addr).output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let resolved = parse_arp_output(&stdout, addr);
        trace!(ip = %addr, hw = ?resolved, "Neighbor table lookup");
        resolved
    }
}

#[cfg(not(windows))]
fn arp_command(addr: Ipv4Addr) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("arp");
    cmd.args(["-n", &addr.to_string()]);
    cmd
}

#[cfg(windows)]
fn arp_command(addr: Ipv4Addr) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("arp");
    cmd.args(["-a", &addr.to_string()]);
    cmd
}

/// Extract a hardware address for `addr` from `arp` output.
///
/// The first line containing the address wins; within it, the first
/// whitespace-separated token containing `:` or `-` is taken as the
/// hardware address and normalized to lowercase colon form.
fn parse_arp_output(output: &str, addr: Ipv4Addr) -> Option<String> {
    let needle = addr.to_string();
    let line = output.lines().find(|line| line.contains(&needle))?;
    let token = line
        .split_whitespace()
        .find(|field| field.contains(':') || field.contains('-'))?;
    Some(normalize_hardware_addr(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux_arp_output() {
        let output = "Address                  HWtype  HWaddress           Flags Mask            Iface\n\
                      192.168.1.10             ether   AA:BB:CC:DD:EE:FF   C                     eth0\n";
        assert_eq!(
            parse_arp_output(output, Ipv4Addr::new(192, 168, 1, 10)).as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
    }

    #[test]
    fn test_parse_windows_arp_output() {
        let output = "Interface: 192.168.1.5 --- 0xb\n\
                      \x20 Internet Address      Physical Address      Type\n\
                      \x20 192.168.1.10          aa-bb-cc-dd-ee-ff     dynamic\n";
        assert_eq!(
            parse_arp_output(output, Ipv4Addr::new(192, 168, 1, 10)).as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
    }

    #[test]
    fn test_no_line_for_address() {
        let output = "192.168.1.11             ether   11:22:33:44:55:66   C     eth0\n";
        assert_eq!(parse_arp_output(output, Ipv4Addr::new(192, 168, 1, 10)), None);
    }

    #[test]
    fn test_line_without_hardware_token() {
        let output = "192.168.1.10 (incomplete) eth0\n";
        assert_eq!(parse_arp_output(output, Ipv4Addr::new(192, 168, 1, 10)), None);
    }
}

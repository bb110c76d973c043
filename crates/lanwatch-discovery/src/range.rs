//! Local subnet detection and CIDR host enumeration

use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Fallback returned when no local route can be established.
pub const FALLBACK_CIDR: &str = "192.168.1.0/24";

/// Public address used to make the OS pick a local route. No datagram is
/// ever sent to it.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("invalid CIDR notation: {0}")]
    InvalidNotation(String),
    #[error("invalid address in CIDR: {0}")]
    InvalidAddress(String),
    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),
}

/// A parsed IPv4 CIDR range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl Cidr {
    fn mask(&self) -> u32 {
        // checked_shl: a /0 mask is all zeros, a plain shift by 32 would overflow
        u32::MAX
            .checked_shl(u32::from(32 - self.prefix_len.min(32)))
            .unwrap_or(0)
    }

    /// Network address of the range.
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & self.mask())
    }

    /// Broadcast address of the range.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & self.mask() | !self.mask())
    }

    /// Every host address in the range in ascending numeric order, with the
    /// network and broadcast positions skipped. `/31` and `/32` ranges have
    /// no hosts.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let network = u32::from(self.network());
        let broadcast = u32::from(self.broadcast());
        let range = if broadcast - network >= 2 {
            network + 1..broadcast
        } else {
            // empty
            1..1
        };
        range.map(Ipv4Addr::from)
    }
}

impl FromStr for Cidr {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| RangeError::InvalidNotation(s.to_string()))?;
        let addr = Ipv4Addr::from_str(addr)
            .map_err(|_| RangeError::InvalidAddress(addr.to_string()))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| RangeError::InvalidPrefix(prefix.to_string()))?;
        if prefix_len > 32 {
            return Err(RangeError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self { addr, prefix_len })
    }
}

impl std::fmt::Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

/// Detect the local subnet to scan.
///
/// Connects a UDP socket toward a well-known public address so the OS picks
/// a local route, reads back the local endpoint, and assumes a /24 around
/// it. Returns [`FALLBACK_CIDR`] when no route can be established; never
/// errors.
pub async fn local_cidr() -> String {
    match detect_local_cidr().await {
        Some(cidr) => cidr,
        None => {
            debug!(fallback = FALLBACK_CIDR, "No local route, using fallback range");
            FALLBACK_CIDR.to_string()
        }
    }
}

async fn detect_local_cidr() -> Option<String> {
    let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect(ROUTE_PROBE_ADDR).await.ok()?;
    let local = socket.local_addr().ok()?;
    match local.ip() {
        std::net::IpAddr::V4(ip) => {
            let [a, b, c, _] = ip.octets();
            Some(format!("{a}.{b}.{c}.0/24"))
        }
        std::net::IpAddr::V6(_) => None,
    }
}

//! Device types for hosts discovered on the local subnet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Prefix carried by hardware-address sentinels (`unknown_<ip>`).
pub const SENTINEL_PREFIX: &str = "unknown_";

/// A host discovered during one scan cycle.
///
/// Instances are created fresh each cycle and handed to the store for
/// persistence; the core keeps no cross-cycle identity beyond the address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// IPv4 address of the host, unique within a cycle
    pub addr: Ipv4Addr,
    /// Canonical lowercase colon-separated hardware address, or the
    /// `unknown_<addr>` sentinel when neighbor resolution failed
    pub hardware_addr: String,
    /// When this cycle's probe saw the host
    pub last_seen: DateTime<Utc>,
    /// Vendor display name, filled in after vendor resolution
    pub vendor: Option<String>,
}

impl Device {
    /// Create a device for an address that answered the liveness probe.
    ///
    /// An empty `hardware_addr` is replaced with the sentinel for `addr`.
    pub fn new(addr: Ipv4Addr, hardware_addr: String) -> Self {
        let hardware_addr = if hardware_addr.is_empty() {
            sentinel_for(addr)
        } else {
            hardware_addr
        };
        Self {
            addr,
            hardware_addr,
            last_seen: Utc::now(),
            vendor: None,
        }
    }

    /// Whether this device carries a sentinel instead of a real hardware
    /// address. Sentinels never participate in vendor lookups or caching.
    pub fn has_sentinel_hardware_addr(&self) -> bool {
        is_sentinel(&self.hardware_addr)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.addr, self.hardware_addr)
    }
}

/// The sentinel standing in for "hardware resolution failed" on `addr`.
pub fn sentinel_for(addr: Ipv4Addr) -> String {
    format!("{SENTINEL_PREFIX}{addr}")
}

/// Whether `hw` is a resolution-failure sentinel rather than a real address.
pub fn is_sentinel(hw: &str) -> bool {
    hw.starts_with(SENTINEL_PREFIX)
}

/// Normalize a hardware address to canonical form: dashes become colons and
/// hex digits are lowercased. `AA-BB-CC-DD-EE-FF` and `aa:bb:cc:dd:ee:ff`
/// both normalize to `aa:bb:cc:dd:ee:ff`.
pub fn normalize_hardware_addr(raw: &str) -> String {
    raw.replace('-', ":").to_lowercase()
}

/// Event pushed to the notification collaborator.
///
/// Serialized with a `type` tag; the discovery core emits exactly one
/// `DiscoveryComplete` per finished cycle, wire form
/// `{"type":"discovery_complete"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    /// A scan cycle finished and the store reflects its results
    DiscoveryComplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dashes_and_case() {
        assert_eq!(
            normalize_hardware_addr("AA-BB-CC-DD-EE-FF"),
            "aa:bb:cc:dd:ee:ff"
        );
        assert_eq!(
            normalize_hardware_addr("aa:bb:cc:dd:ee:ff"),
            "aa:bb:cc:dd:ee:ff"
        );
    }

    #[test]
    fn test_empty_hardware_addr_becomes_sentinel() {
        let device = Device::new(Ipv4Addr::new(10, 0, 0, 5), String::new());
        assert_eq!(device.hardware_addr, "unknown_10.0.0.5");
        assert!(device.has_sentinel_hardware_addr());
    }

    #[test]
    fn test_real_hardware_addr_is_not_sentinel() {
        let device = Device::new(
            Ipv4Addr::new(192, 168, 1, 10),
            "aa:bb:cc:dd:ee:ff".to_string(),
        );
        assert!(!device.has_sentinel_hardware_addr());
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_string(&DiscoveryEvent::DiscoveryComplete).unwrap();
        assert_eq!(json, r#"{"type":"discovery_complete"}"#);
    }
}

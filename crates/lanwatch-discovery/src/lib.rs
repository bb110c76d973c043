//! Lanwatch Discovery - Periodic subnet discovery engine
//!
//! This crate implements the scan cycle end to end:
//! - Local subnet detection and CIDR host enumeration
//! - A bounded pool of workers probing liveness and resolving hardware
//!   addresses through the OS neighbor table
//! - Cache-aside vendor enrichment against an external lookup API
//! - The orchestrator loop driving cycles on a fixed period

pub mod neighbor;
pub mod orchestrator;
pub mod pool;
pub mod probe;
pub mod range;
pub mod vendor;

pub use neighbor::{ArpTableReader, NeighborTableReader};
pub use orchestrator::{DiscoveryOrchestrator, OrchestratorConfig};
pub use pool::ProbePool;
pub use probe::{PingProber, Prober};
pub use range::{local_cidr, Cidr, RangeError};
pub use vendor::{MacVendorsApi, VendorLookup, VendorResolver};

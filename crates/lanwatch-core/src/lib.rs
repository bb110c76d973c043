//! Lanwatch Core - Domain types and collaborator interfaces
//!
//! This crate provides the foundational pieces of the Lanwatch system:
//! - Device types for hosts discovered on the local subnet
//! - Hardware-address normalization and the `unknown_<ip>` sentinel
//! - Collaborator traits for persistence, history, statistics, and
//!   notification
//! - A JSON-manifest store implementing the persistence collaborators

pub mod device;
pub mod store;

pub use device::{normalize_hardware_addr, Device, DiscoveryEvent};
pub use store::{
    DailyStats, DeviceRecord, DeviceSnapshot, DeviceStore, HistoryStore, JsonStore, Notifier,
    StatsAggregator, StoreError,
};

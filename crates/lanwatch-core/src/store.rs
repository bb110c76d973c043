//! Collaborator interfaces and the JSON-manifest store
//!
//! The discovery core talks to the rest of the application through four
//! narrow traits: [`DeviceStore`] (device upsert + vendor cache),
//! [`HistoryStore`] (point-in-time snapshots), [`StatsAggregator`] (per-day
//! statistics), and [`Notifier`] (push events). [`JsonStore`] implements the
//! first three against a single manifest file that is loaded at startup and
//! rewritten after each mutation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::device::{Device, DiscoveryEvent};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Persistence collaborator: insert-or-update devices by address and hold
/// the vendor cache keyed by canonical hardware address.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError>;

    /// Exact-match vendor cache lookup.
    async fn cached_vendor(&self, hardware_addr: &str) -> Option<String>;

    /// Write a vendor cache entry. Only successful lookups are cached;
    /// sentinel addresses never reach this method.
    async fn cache_vendor(&self, hardware_addr: &str, vendor: &str) -> Result<(), StoreError>;
}

/// History collaborator: record a point-in-time snapshot of a device.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_snapshot(&self, device: &Device, tag: &str) -> Result<(), StoreError>;
}

/// Aggregation collaborator: compute and persist per-day statistics.
/// Invoked once per completed scan cycle.
#[async_trait]
pub trait StatsAggregator: Send + Sync {
    async fn aggregate(&self, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Notification collaborator: deliver a structured event to whoever is
/// listening (the daemon forwards these to WebSocket clients).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: DiscoveryEvent);
}

/// The persisted form of a device, keyed by address in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub addr: Ipv4Addr,
    pub hardware_addr: String,
    pub vendor: Option<String>,
    /// When the device was first discovered
    pub first_seen: DateTime<Utc>,
    /// When the device last answered a probe
    pub last_seen: DateTime<Utc>,
}

/// A point-in-time history entry for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub addr: Ipv4Addr,
    pub hardware_addr: String,
    pub vendor: Option<String>,
    pub tag: String,
    pub recorded_at: DateTime<Utc>,
}

/// Derived statistics for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Devices seen on this day
    pub device_count: usize,
    /// Devices first seen on this day
    pub new_devices: usize,
}

/// On-disk manifest holding everything the store persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default = "default_version")]
    version: String,
    /// Device records keyed by dotted-quad address
    #[serde(default)]
    devices: HashMap<String, DeviceRecord>,
    /// Vendor names keyed by canonical hardware address
    #[serde(default)]
    vendor_cache: HashMap<String, String>,
    /// Snapshot history in recording order
    #[serde(default)]
    history: Vec<DeviceSnapshot>,
    /// Daily statistics keyed by ISO date
    #[serde(default)]
    daily_stats: HashMap<String, DailyStats>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Manifest {
    fn from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_or_create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self {
                version: default_version(),
                ..Self::default()
            })
        }
    }

    fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// File-backed store implementing the persistence collaborators.
pub struct JsonStore {
    path: PathBuf,
    manifest: RwLock<Manifest>,
}

impl JsonStore {
    /// Open the store at `path`, creating an empty manifest if the file
    /// does not exist yet.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let manifest = Manifest::load_or_create(&path)?;
        debug!(
            path = %path.display(),
            devices = manifest.devices.len(),
            "Opened device store"
        );
        Ok(Self {
            path,
            manifest: RwLock::new(manifest),
        })
    }

    /// All device records, sorted by address.
    pub async fn devices(&self) -> Vec<DeviceRecord> {
        let manifest = self.manifest.read().await;
        let mut records: Vec<DeviceRecord> = manifest.devices.values().cloned().collect();
        records.sort_by_key(|r| r.addr);
        records
    }

    /// A single device record by address.
    pub async fn device(&self, addr: Ipv4Addr) -> Option<DeviceRecord> {
        self.manifest.read().await.devices.get(&addr.to_string()).cloned()
    }

    /// Snapshot history for one address, oldest first.
    pub async fn history_for(&self, addr: Ipv4Addr) -> Vec<DeviceSnapshot> {
        let manifest = self.manifest.read().await;
        manifest
            .history
            .iter()
            .filter(|s| s.addr == addr)
            .cloned()
            .collect()
    }

    /// All daily statistics, sorted by date.
    pub async fn daily_stats(&self) -> Vec<DailyStats> {
        let manifest = self.manifest.read().await;
        let mut stats: Vec<DailyStats> = manifest.daily_stats.values().cloned().collect();
        stats.sort_by_key(|s| s.date);
        stats
    }
}

#[async_trait]
impl DeviceStore for JsonStore {
    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        let mut manifest = self.manifest.write().await;
        let key = device.addr.to_string();

        match manifest.devices.entry(key) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.hardware_addr = device.hardware_addr.clone();
                record.vendor = device.vendor.clone();
                record.last_seen = device.last_seen;
            }
            Entry::Vacant(entry) => {
                entry.insert(DeviceRecord {
                    addr: device.addr,
                    hardware_addr: device.hardware_addr.clone(),
                    vendor: device.vendor.clone(),
                    first_seen: device.last_seen,
                    last_seen: device.last_seen,
                });
            }
        }

        manifest.save(&self.path)
    }

    async fn cached_vendor(&self, hardware_addr: &str) -> Option<String> {
        self.manifest.read().await.vendor_cache.get(hardware_addr).cloned()
    }

    async fn cache_vendor(&self, hardware_addr: &str, vendor: &str) -> Result<(), StoreError> {
        let mut manifest = self.manifest.write().await;
        manifest
            .vendor_cache
            .insert(hardware_addr.to_string(), vendor.to_string());
        manifest.save(&self.path)
    }
}

#[async_trait]
impl HistoryStore for JsonStore {
    async fn record_snapshot(&self, device: &Device, tag: &str) -> Result<(), StoreError> {
        let mut manifest = self.manifest.write().await;
        manifest.history.push(DeviceSnapshot {
            addr: device.addr,
            hardware_addr: device.hardware_addr.clone(),
            vendor: device.vendor.clone(),
            tag: tag.to_string(),
            recorded_at: Utc::now(),
        });
        manifest.save(&self.path)
    }
}

#[async_trait]
impl StatsAggregator for JsonStore {
    async fn aggregate(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        let day = at.date_naive();
        let mut manifest = self.manifest.write().await;

        let device_count = manifest
            .devices
            .values()
            .filter(|r| r.last_seen.date_naive() == day)
            .count();
        let new_devices = manifest
            .devices
            .values()
            .filter(|r| r.first_seen.date_naive() == day)
            .count();

        manifest.daily_stats.insert(
            day.to_string(),
            DailyStats {
                date: day,
                device_count,
                new_devices,
            },
        );
        manifest.save(&self.path)
    }
}

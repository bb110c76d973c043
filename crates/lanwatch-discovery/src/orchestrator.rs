//! The periodic scan cycle: range → pool → enrichment → collaborators

use anyhow::Result;
use chrono::Utc;
use lanwatch_core::{Device, DeviceStore, DiscoveryEvent, HistoryStore, Notifier, StatsAggregator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::pool::ProbePool;
use crate::range::local_cidr;
use crate::vendor::VendorResolver;

/// Tag recorded on every history snapshot written by the discovery core.
pub const SNAPSHOT_TAG: &str = "snapshot";

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Nominal time between cycle starts. Cycles are strictly sequential:
    /// a slow cycle pushes the next start out instead of overlapping it.
    pub scan_interval: Duration,
    /// Scan this range instead of auto-detecting the local subnet.
    pub range_override: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(300),
            range_override: None,
        }
    }
}

/// Drives one scan cycle end to end on a fixed period and reports
/// completion to the collaborators. At most one cycle is ever in flight.
pub struct DiscoveryOrchestrator {
    config: OrchestratorConfig,
    pool: ProbePool,
    vendors: VendorResolver,
    store: Arc<dyn DeviceStore>,
    history: Arc<dyn HistoryStore>,
    stats: Arc<dyn StatsAggregator>,
    notifier: Arc<dyn Notifier>,
    cancel: watch::Receiver<bool>,
    /// Serializes cycles so a manually triggered scan cannot overlap the
    /// periodic one.
    cycle_gate: tokio::sync::Mutex<()>,
}

impl DiscoveryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        pool: ProbePool,
        vendors: VendorResolver,
        store: Arc<dyn DeviceStore>,
        history: Arc<dyn HistoryStore>,
        stats: Arc<dyn StatsAggregator>,
        notifier: Arc<dyn Notifier>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            pool,
            vendors,
            store,
            history,
            stats,
            notifier,
            cancel,
            cycle_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Run cycles forever, until the cancellation signal flips.
    pub async fn run(&self) {
        let mut ticker = interval(self.config.scan_interval);
        // A cycle longer than the period delays the next start rather than
        // bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = cancel.changed() => {
                    // A dropped sender also means shutdown.
                    if changed.is_err() || *cancel.borrow() {
                        info!("Discovery loop stopping");
                        return;
                    }
                    continue;
                }
            }

            // A failed cycle is logged and skipped, never fatal.
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Scan cycle abandoned");
            }
        }
    }

    /// Run a single scan cycle and return the enriched devices.
    pub async fn run_once(&self) -> Result<Vec<Device>> {
        let _in_flight = self.cycle_gate.lock().await;
        let range = match &self.config.range_override {
            Some(cidr) => cidr.clone(),
            None => local_cidr().await,
        };
        info!(range = %range, "Starting discovery cycle");

        let mut devices = self.pool.sweep(&range, self.cancel.clone()).await?;

        for device in devices.iter_mut() {
            if *self.cancel.borrow() {
                break;
            }

            let vendor = self.vendors.resolve(&device.hardware_addr).await;
            device.vendor = Some(vendor);

            if let Err(e) = self.store.upsert_device(device).await {
                warn!(ip = %device.addr, error = %e, "Failed to persist device");
            }
            if let Err(e) = self.history.record_snapshot(device, SNAPSHOT_TAG).await {
                warn!(ip = %device.addr, error = %e, "Failed to record history");
            }
        }

        // An aborted cycle must not announce itself as complete.
        if *self.cancel.borrow() {
            info!("Discovery cycle cancelled");
            return Ok(devices);
        }

        if let Err(e) = self.stats.aggregate(Utc::now()).await {
            warn!(error = %e, "Failed to aggregate daily statistics");
        }
        self.notifier.notify(DiscoveryEvent::DiscoveryComplete).await;

        info!(found = devices.len(), "Discovery cycle complete");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NeighborTableReader;
    use crate::probe::Prober;
    use crate::vendor::VendorLookup;
    use async_trait::async_trait;
    use lanwatch_core::StoreError;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    struct FakeProber {
        alive: Vec<Ipv4Addr>,
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn check(&self, addr: Ipv4Addr) -> bool {
            self.alive.contains(&addr)
        }
    }

    struct FakeNeighbors;

    #[async_trait]
    impl NeighborTableReader for FakeNeighbors {
        async fn resolve(&self, _addr: Ipv4Addr) -> Option<String> {
            Some("aa:bb:cc:dd:ee:ff".to_string())
        }
    }

    struct FakeApi;

    #[async_trait]
    impl VendorLookup for FakeApi {
        async fn lookup(&self, _hardware_addr: &str) -> Result<Option<String>> {
            Ok(Some("Acme".to_string()))
        }
    }

    /// Records every collaborator call the cycle makes.
    #[derive(Default)]
    struct CollabSpy {
        upserted: Mutex<Vec<Device>>,
        snapshots: Mutex<Vec<(Device, String)>>,
        aggregations: Mutex<usize>,
        events: Mutex<Vec<DiscoveryEvent>>,
    }

    #[async_trait]
    impl DeviceStore for CollabSpy {
        async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
            self.upserted.lock().unwrap().push(device.clone());
            Ok(())
        }
        async fn cached_vendor(&self, _hardware_addr: &str) -> Option<String> {
            None
        }
        async fn cache_vendor(&self, _hw: &str, _vendor: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[async_trait]
    impl HistoryStore for CollabSpy {
        async fn record_snapshot(&self, device: &Device, tag: &str) -> Result<(), StoreError> {
            self.snapshots
                .lock()
                .unwrap()
                .push((device.clone(), tag.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl StatsAggregator for CollabSpy {
        async fn aggregate(&self, _at: chrono::DateTime<Utc>) -> Result<(), StoreError> {
            *self.aggregations.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for CollabSpy {
        async fn notify(&self, event: DiscoveryEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn orchestrator(alive: Vec<Ipv4Addr>, spy: Arc<CollabSpy>) -> DiscoveryOrchestrator {
        orchestrator_with_cancel(alive, spy, watch::channel(false).1)
    }

    fn orchestrator_with_cancel(
        alive: Vec<Ipv4Addr>,
        spy: Arc<CollabSpy>,
        cancel: watch::Receiver<bool>,
    ) -> DiscoveryOrchestrator {
        let pool = ProbePool::new(Arc::new(FakeProber { alive }), Arc::new(FakeNeighbors));
        let vendors = VendorResolver::new(spy.clone(), Arc::new(FakeApi));
        let config = OrchestratorConfig {
            scan_interval: Duration::from_secs(300),
            range_override: Some("192.168.5.0/28".to_string()),
        };
        DiscoveryOrchestrator::new(
            config,
            pool,
            vendors,
            spy.clone(),
            spy.clone(),
            spy.clone(),
            spy,
            cancel,
        )
    }

    #[tokio::test]
    async fn test_cycle_enriches_and_notifies() {
        let spy = Arc::new(CollabSpy::default());
        let alive = Ipv4Addr::new(192, 168, 5, 3);
        let orch = orchestrator(vec![alive], spy.clone());

        let devices = orch.run_once().await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].addr, alive);
        assert_eq!(devices[0].vendor.as_deref(), Some("Acme"));

        assert_eq!(spy.upserted.lock().unwrap().len(), 1);
        let snapshots = spy.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].1, "snapshot");
        assert_eq!(*spy.aggregations.lock().unwrap(), 1);
        assert_eq!(
            *spy.events.lock().unwrap(),
            vec![DiscoveryEvent::DiscoveryComplete]
        );
    }

    #[tokio::test]
    async fn test_empty_subnet_still_completes() {
        let spy = Arc::new(CollabSpy::default());
        let orch = orchestrator(Vec::new(), spy.clone());

        let devices = orch.run_once().await.unwrap();

        assert!(devices.is_empty());
        assert!(spy.upserted.lock().unwrap().is_empty());
        assert_eq!(*spy.aggregations.lock().unwrap(), 1);
        assert_eq!(spy.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_cycle_is_not_announced_complete() {
        let spy = Arc::new(CollabSpy::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let orch = orchestrator_with_cancel(
            vec![Ipv4Addr::new(192, 168, 5, 3)],
            spy.clone(),
            cancel_rx,
        );

        cancel_tx.send(true).unwrap();
        orch.run_once().await.unwrap();

        assert_eq!(*spy.aggregations.lock().unwrap(), 0);
        assert!(spy.events.lock().unwrap().is_empty());
    }
}

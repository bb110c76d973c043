//! Bounded-concurrency fan-out/fan-in over a subnet's host addresses

use anyhow::Result;
use lanwatch_core::Device;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use crate::neighbor::NeighborTableReader;
use crate::probe::Prober;
use crate::range::Cidr;

/// Worker count bounds the number of concurrently spawned probe processes,
/// trading discovery latency for resource usage.
pub const WORKER_COUNT: usize = 20;

/// Queue capacity gives natural backpressure against the producer outrunning
/// the workers.
const QUEUE_CAPACITY: usize = 256;

/// Fan-out/fan-in pool combining liveness probing and neighbor resolution
/// over every host address in a range.
pub struct ProbePool {
    prober: Arc<dyn Prober>,
    neighbors: Arc<dyn NeighborTableReader>,
    workers: usize,
}

impl ProbePool {
    pub fn new(prober: Arc<dyn Prober>, neighbors: Arc<dyn NeighborTableReader>) -> Self {
        Self {
            prober,
            neighbors,
            workers: WORKER_COUNT,
        }
    }

    /// Override the worker count (configuration hook; the default is
    /// [`WORKER_COUNT`]).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Probe every host address in `cidr` and return a Device for each one
    /// that answered, in worker-completion order.
    ///
    /// The call blocks until all workers have drained the queue; there is no
    /// partial-result path. A malformed CIDR fails before any worker is
    /// started. Flipping `cancel` to true stops the producer and makes
    /// workers drain the queue without probing.
    pub async fn sweep(&self, cidr: &str, cancel: watch::Receiver<bool>) -> Result<Vec<Device>> {
        let cidr: Cidr = cidr.parse()?;

        let (tx, rx) = mpsc::channel::<Ipv4Addr>(QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));
        let devices: Arc<Mutex<Vec<Device>>> = Arc::new(Mutex::new(Vec::new()));

        let mut workers = JoinSet::new();
        for _ in 0..self.workers {
            let rx = rx.clone();
            let devices = devices.clone();
            let prober = self.prober.clone();
            let neighbors = self.neighbors.clone();
            let cancel = cancel.clone();

            workers.spawn(async move {
                loop {
                    // Hold the receiver lock only while dequeuing so the
                    // other workers keep draining during the probe.
                    let addr = { rx.lock().await.recv().await };
                    let Some(addr) = addr else { break };

                    if *cancel.borrow() {
                        continue;
                    }
                    if !prober.check(addr).await {
                        continue;
                    }

                    let hardware_addr = neighbors.resolve(addr).await.unwrap_or_default();
                    let device = Device::new(addr, hardware_addr);
                    devices.lock().await.push(device);
                }
            });
        }

        // Feed addresses in ascending order; a full queue suspends us here.
        for addr in cidr.hosts() {
            if *cancel.borrow() {
                break;
            }
            if tx.send(addr).await.is_err() {
                break;
            }
        }
        drop(tx);

        // Barrier: the sweep is over only when every worker has exited.
        while workers.join_next().await.is_some() {}

        let devices = std::mem::take(&mut *devices.lock().await);
        debug!(range = %cidr, found = devices.len(), "Sweep complete");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProber {
        alive: HashSet<Ipv4Addr>,
        checks: AtomicUsize,
    }

    impl FakeProber {
        fn new(alive: impl IntoIterator<Item = Ipv4Addr>) -> Self {
            Self {
                alive: alive.into_iter().collect(),
                checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn check(&self, addr: Ipv4Addr) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.alive.contains(&addr)
        }
    }

    struct FakeNeighbors {
        hardware_addr: Option<String>,
    }

    #[async_trait]
    impl NeighborTableReader for FakeNeighbors {
        async fn resolve(&self, _addr: Ipv4Addr) -> Option<String> {
            self.hardware_addr.clone()
        }
    }

    fn pool_with(
        prober: Arc<FakeProber>,
        hardware_addr: Option<&str>,
    ) -> ProbePool {
        ProbePool::new(
            prober,
            Arc::new(FakeNeighbors {
                hardware_addr: hardware_addr.map(String::from),
            }),
        )
    }

    fn no_cancel() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_single_alive_host() {
        let alive = Ipv4Addr::new(192, 168, 1, 42);
        let prober = Arc::new(FakeProber::new([alive]));
        let pool = pool_with(prober.clone(), Some("aa:bb:cc:dd:ee:ff"));

        let devices = pool.sweep("192.168.1.0/24", no_cancel()).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].addr, alive);
        assert_eq!(devices[0].hardware_addr, "aa:bb:cc:dd:ee:ff");
        // Every host in the range was probed, network/broadcast never
        assert_eq!(prober.checks.load(Ordering::SeqCst), 254);
    }

    #[tokio::test]
    async fn test_resolution_miss_yields_sentinel() {
        let alive = Ipv4Addr::new(10, 0, 0, 5);
        let prober = Arc::new(FakeProber::new([alive]));
        let pool = pool_with(prober, None);

        let devices = pool.sweep("10.0.0.0/28", no_cancel()).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].hardware_addr, "unknown_10.0.0.5");
    }

    #[tokio::test]
    async fn test_malformed_cidr_fails_before_probing() {
        let prober = Arc::new(FakeProber::new([]));
        let pool = pool_with(prober.clone(), None);

        let result = pool.sweep("not-a-cidr", no_cancel()).await;
        assert!(result.is_err());
        assert_eq!(prober.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_lost_or_duplicated_devices() {
        // Exactly 20 alive hosts, one per worker slot.
        let alive: Vec<Ipv4Addr> = (1..=20).map(|i| Ipv4Addr::new(172, 16, 0, i)).collect();
        let prober = Arc::new(FakeProber::new(alive.clone()));
        let pool = pool_with(prober, Some("aa:bb:cc:dd:ee:ff"));

        let devices = pool.sweep("172.16.0.0/24", no_cancel()).await.unwrap();
        assert_eq!(devices.len(), 20);
        let unique: HashSet<Ipv4Addr> = devices.iter().map(|d| d.addr).collect();
        assert_eq!(unique.len(), 20);
        let expected: HashSet<Ipv4Addr> = alive.into_iter().collect();
        assert_eq!(unique, expected);
    }

    #[tokio::test]
    async fn test_concurrent_sweeps_over_disjoint_ranges() {
        let left: Vec<Ipv4Addr> = (1..=10).map(|i| Ipv4Addr::new(10, 1, 0, i)).collect();
        let right: Vec<Ipv4Addr> = (1..=10).map(|i| Ipv4Addr::new(10, 2, 0, i)).collect();

        let pool_left = Arc::new(pool_with(
            Arc::new(FakeProber::new(left.clone())),
            Some("aa:bb:cc:dd:ee:ff"),
        ));
        let pool_right = Arc::new(pool_with(
            Arc::new(FakeProber::new(right.clone())),
            Some("11:22:33:44:55:66"),
        ));

        let (a, b) = tokio::join!(
            pool_left.sweep("10.1.0.0/24", no_cancel()),
            pool_right.sweep("10.2.0.0/24", no_cancel()),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(a.len(), 10);
        assert_eq!(b.len(), 10);
        assert!(a.iter().all(|d| left.contains(&d.addr)));
        assert!(b.iter().all(|d| right.contains(&d.addr)));
    }

    #[tokio::test]
    async fn test_cancelled_sweep_probes_nothing() {
        let prober = Arc::new(FakeProber::new([Ipv4Addr::new(192, 168, 1, 1)]));
        let pool = pool_with(prober.clone(), None);

        let (tx, rx) = watch::channel(true);
        let devices = pool.sweep("192.168.1.0/24", rx).await.unwrap();
        drop(tx);

        assert!(devices.is_empty());
        assert_eq!(prober.checks.load(Ordering::SeqCst), 0);
    }
}

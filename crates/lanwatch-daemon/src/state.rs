//! Application state management

use anyhow::Result;
use async_trait::async_trait;
use lanwatch_core::{DiscoveryEvent, JsonStore, Notifier};
use lanwatch_discovery::{
    ArpTableReader, DiscoveryOrchestrator, MacVendorsApi, PingProber, ProbePool, VendorResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Device/history/statistics store
    pub store: Arc<JsonStore>,
    /// Scan cycle driver
    pub orchestrator: Arc<DiscoveryOrchestrator>,
    /// Event broadcast for WebSocket clients
    pub events: broadcast::Sender<DiscoveryEvent>,
}

impl AppState {
    /// Wire the store, the discovery engine, and the event channel together.
    pub fn new(config: &Config, cancel: watch::Receiver<bool>) -> Result<Arc<Self>> {
        let store = Arc::new(JsonStore::new(PathBuf::from(&config.storage.path))?);
        let (events, _) = broadcast::channel(100);

        let pool = ProbePool::new(Arc::new(PingProber), Arc::new(ArpTableReader))
            .with_workers(config.discovery.workers);
        let vendors = VendorResolver::new(store.clone(), Arc::new(MacVendorsApi::new()?));
        let notifier = Arc::new(BroadcastNotifier {
            events: events.clone(),
        });

        let orchestrator = Arc::new(DiscoveryOrchestrator::new(
            config.to_orchestrator_config(),
            pool,
            vendors,
            store.clone(),
            store.clone(),
            store.clone(),
            notifier,
            cancel,
        ));

        Ok(Arc::new(Self {
            store,
            orchestrator,
            events,
        }))
    }

    /// Subscribe to discovery events
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }
}

/// Notification collaborator backed by the daemon's broadcast channel.
/// Send errors just mean nobody is listening.
struct BroadcastNotifier {
    events: broadcast::Sender<DiscoveryEvent>,
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, event: DiscoveryEvent) {
        let _ = self.events.send(event);
    }
}

//! Cache-aside vendor enrichment for hardware addresses

use anyhow::{Context, Result};
use async_trait::async_trait;
use lanwatch_core::device::is_sentinel;
use lanwatch_core::DeviceStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the external vendor lookup service.
pub const VENDOR_API_URL: &str = "https://api.macvendors.com";

/// Client-side timeout for one lookup request.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Vendor name used on every failure path.
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Capability interface for the authoritative vendor source.
///
/// `Ok(Some(name))` is a successful lookup, `Ok(None)` a definitive miss
/// (non-200 response), `Err` a transport failure. Only the first outcome is
/// ever cached.
#[async_trait]
pub trait VendorLookup: Send + Sync {
    async fn lookup(&self, hardware_addr: &str) -> Result<Option<String>>;
}

/// Looks vendors up against the macvendors.com API, address embedded in the
/// request path, plain-text vendor name in the 200 body.
pub struct MacVendorsApi {
    client: reqwest::Client,
    base_url: String,
}

impl MacVendorsApi {
    pub fn new() -> Result<Self> {
        Self::with_base_url(VENDOR_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VendorLookup for MacVendorsApi {
    async fn lookup(&self, hardware_addr: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", self.base_url, hardware_addr);
        let response = self.client.get(&url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(hw = %hardware_addr, status = %response.status(), "Vendor lookup miss");
            return Ok(None);
        }

        let body = response.text().await?;
        Ok(Some(body.trim().to_string()))
    }
}

/// Cache-aside resolver from hardware address to vendor display name.
///
/// Never fails: every failure path degrades to [`UNKNOWN_VENDOR`]. Misses
/// are deliberately not cached, so an address with unreachable vendor
/// identity is retried on every future cycle instead of being pinned to
/// "Unknown".
pub struct VendorResolver {
    cache: Arc<dyn DeviceStore>,
    api: Arc<dyn VendorLookup>,
}

impl VendorResolver {
    pub fn new(cache: Arc<dyn DeviceStore>, api: Arc<dyn VendorLookup>) -> Self {
        Self { cache, api }
    }

    pub async fn resolve(&self, hardware_addr: &str) -> String {
        // Sentinels never reach the cache or the network.
        if hardware_addr.is_empty() || is_sentinel(hardware_addr) {
            return UNKNOWN_VENDOR.to_string();
        }

        if let Some(name) = self.cache.cached_vendor(hardware_addr).await {
            return name;
        }

        match self.api.lookup(hardware_addr).await {
            Ok(Some(name)) => {
                if let Err(e) = self.cache.cache_vendor(hardware_addr, &name).await {
                    warn!(hw = %hardware_addr, error = %e, "Failed to write vendor cache");
                }
                name
            }
            Ok(None) => UNKNOWN_VENDOR.to_string(),
            Err(e) => {
                debug!(hw = %hardware_addr, error = %e, "Vendor lookup failed");
                UNKNOWN_VENDOR.to_string()
            }
        }
    }
}

//! Single-instance guard

use anyhow::{Context, Result};
use std::net::TcpListener;
use tracing::debug;

/// Exclusively held loopback endpoint marking this process as the running
/// instance. Acquired once at startup and released with process lifetime;
/// a second instance fails to bind and exits instead of opening another
/// window.
pub struct InstanceLock {
    _listener: TcpListener,
}

impl InstanceLock {
    pub fn acquire(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .with_context(|| format!("instance lock port {port} is already held"))?;
        debug!(port, "Instance lock acquired");
        Ok(Self {
            _listener: listener,
        })
    }
}

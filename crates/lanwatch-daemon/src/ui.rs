//! UI launch capability

use tracing::{info, warn};

/// Opens the local UI for the user. Implementations pick the platform
/// mechanism; failure to open is logged and never fatal.
pub trait UiLauncher: Send + Sync {
    fn open(&self, url: &str);
}

/// Launches the UI in the system default browser.
pub struct BrowserLauncher;

impl UiLauncher for BrowserLauncher {
    fn open(&self, url: &str) {
        match open::that(url) {
            Ok(()) => info!(url, "Opened UI in default browser"),
            Err(e) => warn!(url, error = %e, "Could not open browser"),
        }
    }
}

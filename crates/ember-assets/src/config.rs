//! Configuration for the asset server.

use std::time::Duration;

/// Default upper bound on how long `shutdown` waits for workers.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings fixed at [`AssetServer`](crate::AssetServer) construction.
#[derive(Debug, Clone)]
pub struct AssetsConfig {
    /// How long `shutdown` waits for the I/O and CPU workers to stop.
    pub shutdown_timeout: Duration,
    /// Keep a copy of each asset's human-readable name for diagnostics.
    pub track_names: bool,
    /// Worker threads are named `<prefix>-io` and `<prefix>-cpu`.
    pub thread_name_prefix: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            track_names: cfg!(debug_assertions),
            thread_name_prefix: "ember-assets".to_string(),
        }
    }
}

impl AssetsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_track_names(mut self, track: bool) -> Self {
        self.track_names = track;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

//! Test utilities for the Ember engine.
//!
//! - [`ExecutionLog`] - shared append-only log with a blocking wait, for
//!   observing work done on other threads
//! - [`RecordingLifecycle`] - an asset lifecycle that records every destroy
//!   call and releases the child assets its payload holds
//! - [`recording_server`] - an [`AssetServer`](ember_assets::AssetServer) with
//!   a recording lifecycle for every asset type
//!
//! # Example
//!
//! ```rust
//! use ember_assets::AssetType;
//! use ember_test_utils::recording_server;
//!
//! let (assets, destroyed) = recording_server();
//! let mesh = assets.allocate(AssetType::Mesh);
//! assets.releaseref(&mesh);
//!
//! assert_eq!(destroyed.len(), 1);
//! ```

pub mod execution_log;
pub mod mock_lifecycle;

pub use execution_log::*;
pub use mock_lifecycle::*;

/// Install the test log subscriber. Safe to call from every test.
pub fn init_logging() {
    ember_core::logging::init_with_filter("debug");
}

//! Recording asset lifecycle for testing.

use std::thread::{self, ThreadId};
use std::time::Duration;

use ember_assets::{
    AssetHeader, AssetId, AssetLifecycle, AssetRef, AssetServer, AssetType, AssetsConfig,
};

use crate::execution_log::ExecutionLog;

/// Payload created for every asset of a [`RecordingLifecycle`].
#[derive(Debug, Default)]
pub struct MockPayload {
    /// Child assets this one owns a reference to, released on destroy (a model
    /// holding its meshes).
    pub children: Vec<AssetRef>,
    /// Arbitrary data for tests that write into the payload.
    pub bytes: Vec<u8>,
}

/// Records a destroy hook call for verification in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyCall {
    pub asset_type: AssetType,
    pub id: AssetId,
    pub thread: ThreadId,
    /// How many children the payload released.
    pub children: usize,
}

/// Lifecycle that records destroy calls into a shared log.
///
/// Several lifecycles can share one log so cascading destruction across types
/// shows up in order.
#[derive(Clone)]
pub struct RecordingLifecycle {
    asset_type: AssetType,
    log: ExecutionLog<DestroyCall>,
}

impl RecordingLifecycle {
    pub fn new(asset_type: AssetType) -> Self {
        Self::with_log(asset_type, ExecutionLog::new())
    }

    pub fn with_log(asset_type: AssetType, log: ExecutionLog<DestroyCall>) -> Self {
        Self { asset_type, log }
    }

    pub fn log(&self) -> &ExecutionLog<DestroyCall> {
        &self.log
    }

    /// How many times the hook ran for `id`.
    pub fn destroy_count(&self, id: AssetId) -> usize {
        self.log
            .entries()
            .iter()
            .filter(|call| call.id == id)
            .count()
    }
}

impl AssetLifecycle for RecordingLifecycle {
    type Payload = MockPayload;

    fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    fn create(&self) -> MockPayload {
        MockPayload::default()
    }

    fn destroy(&self, assets: &AssetServer, header: &AssetHeader, payload: MockPayload) {
        self.log.push(DestroyCall {
            asset_type: header.asset_type(),
            id: header.id(),
            thread: thread::current().id(),
            children: payload.children.len(),
        });
        for child in &payload.children {
            assets.releaseref(child);
        }
    }
}

/// Config used by [`recording_server`]: names tracked, short shutdown bound.
pub fn test_config() -> AssetsConfig {
    AssetsConfig::default()
        .with_track_names(true)
        .with_shutdown_timeout(Duration::from_secs(2))
        .with_thread_name_prefix("test-assets")
}

/// Server on the calling thread with a [`RecordingLifecycle`] for every asset
/// type, all writing into the returned log.
pub fn recording_server() -> (AssetServer, ExecutionLog<DestroyCall>) {
    recording_server_with(test_config())
}

pub fn recording_server_with(config: AssetsConfig) -> (AssetServer, ExecutionLog<DestroyCall>) {
    let log = ExecutionLog::new();
    let mut builder = AssetServer::builder().with_config(config);
    for asset_type in AssetType::ALL {
        builder = builder.with_lifecycle(RecordingLifecycle::with_log(asset_type, log.clone()));
    }

    match builder.build() {
        Ok(server) => (server, log),
        Err(err) => panic!("failed to start test asset server: {err}"),
    }
}

//! Ember Assets
//!
//! Asset lifecycle and background jobs for the Ember engine: a registry of
//! reference-counted asset headers, deferred destruction for releases made off
//! the owner thread, and I/O, CPU and Gpu job queues drained by a per-frame
//! pump.
//!
//! Everything hangs off an [`AssetServer`], created once at engine start:
//!
//! ```ignore
//! let assets = AssetServer::builder()
//!     .with_lifecycle(FnLifecycle::new(AssetType::Sound, SoundData::default, drop_sound))
//!     .build()?;
//!
//! let sound = assets.allocate(AssetType::Sound);
//! assets.set_id(&sound, "sfx/jump")?;
//! assets.submit(AssetJob::io(move || decode("sfx/jump.ogg")));
//!
//! // once per frame, on the thread that built the server
//! assets.update();
//! ```

pub mod asset_type;
pub mod config;
mod deferred;
pub mod error;
pub mod event;
pub mod header;
pub mod id;
pub mod job;
pub mod lifecycle;
pub mod registry;
pub mod server;
mod worker;

pub use asset_type::AssetType;
pub use config::{AssetsConfig, DEFAULT_SHUTDOWN_TIMEOUT};
pub use error::{AssetError, AssetResult};
pub use event::AssetEvent;
pub use header::{AssetHeader, AssetPayload, AssetRef};
pub use id::{AssetId, AssetKey};
pub use job::{AssetJob, BLOCKING_CATEGORY, JobCategory};
pub use lifecycle::{AssetLifecycle, ErasedAssetLifecycle, FnLifecycle};
pub use registry::{AssetRegistry, LeakedAsset};
pub use server::{AssetServer, AssetServerBuilder, PumpStats};
pub use worker::WorkerState;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AssetError, AssetEvent, AssetHeader, AssetId, AssetJob, AssetLifecycle, AssetRef,
        AssetResult, AssetServer, AssetType, AssetsConfig, FnLifecycle, JobCategory, PumpStats,
    };
}

//! Asset server for allocating, reference counting and destroying assets.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use ember_core::profiling::{profile_function, profile_scope};

use crate::asset_type::AssetType;
use crate::config::AssetsConfig;
use crate::deferred::DeferredQueue;
use crate::error::{AssetError, AssetResult};
use crate::event::{AssetEvent, AssetEventBuffer};
use crate::header::{AssetHeader, AssetRef};
use crate::id::{AssetId, AssetKey};
use crate::job::{AssetJob, JobCategory};
use crate::lifecycle::{AssetLifecycle, ErasedAssetLifecycle, LifecycleTable};
use crate::registry::{AssetRegistry, LeakedAsset};
use crate::worker::{WorkerState, Workers};

/// What a single [`AssetServer::update`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Deferred assets torn down.
    pub destroyed: usize,
    /// Gpu (and blocking) jobs executed.
    pub gpu_jobs: usize,
}

/// Owns every live asset and the background job queues.
///
/// The thread that creates the server is its *owner thread*. Destroy hooks and
/// Gpu jobs only ever run there; releases from other threads are deferred to
/// the next [`update`](Self::update).
///
/// # Example
///
/// ```ignore
/// let assets = AssetServer::builder()
///     .with_lifecycle(MeshLifecycle::new(device.clone()))
///     .build()?;
///
/// let mesh = assets.allocate(AssetType::Mesh);
/// assets.set_id(&mesh, "cube")?;
///
/// loop {
///     assets.update();
///     // render...
/// }
/// ```
pub struct AssetServer {
    config: AssetsConfig,
    registry: AssetRegistry,
    lifecycles: LifecycleTable,
    deferred: DeferredQueue,
    workers: Workers,
    events: AssetEventBuffer,
    owner: ThreadId,
    next_auto_name: AtomicU64,
    shut_down: AtomicBool,
}

static_assertions::assert_impl_all!(AssetServer: Send, Sync);
static_assertions::assert_impl_all!(AssetRef: Send, Sync);

impl AssetServer {
    /// Start the I/O and CPU workers. The calling thread becomes the owner.
    pub fn init(config: AssetsConfig) -> AssetResult<Self> {
        let workers = Workers::spawn(&config)?;
        tracing::debug!(
            "Asset server started (workers '{}-io', '{}-cpu')",
            config.thread_name_prefix,
            config.thread_name_prefix
        );

        Ok(Self {
            config,
            registry: AssetRegistry::new(),
            lifecycles: LifecycleTable::new(),
            deferred: DeferredQueue::new(),
            workers,
            events: AssetEventBuffer::new(),
            owner: thread::current().id(),
            next_auto_name: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn builder() -> AssetServerBuilder {
        AssetServerBuilder::default()
    }

    pub fn config(&self) -> &AssetsConfig {
        &self.config
    }

    /// Register the lifecycle for its asset type, replacing any previous one.
    pub fn register_lifecycle<L: AssetLifecycle>(&self, lifecycle: L) {
        self.lifecycles.register(Arc::new(lifecycle));
    }

    pub fn has_lifecycle(&self, asset_type: AssetType) -> bool {
        self.lifecycles.contains(asset_type)
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    // ---- registry ----

    /// Allocate a new asset holding one reference.
    ///
    /// The asset gets a synthetic name `auto/asset_<n>`; give it a real one
    /// with [`set_id`](Self::set_id).
    ///
    /// # Panics
    ///
    /// If no lifecycle is registered for `asset_type`.
    pub fn allocate(&self, asset_type: AssetType) -> AssetRef {
        profile_function!();

        let Some(lifecycle) = self.lifecycles.get(asset_type) else {
            tracing::error!("Cannot allocate {}: no lifecycle registered", asset_type);
            panic!("no lifecycle registered for asset type {asset_type}");
        };
        let payload = lifecycle.create_erased();

        let serial = self.next_auto_name.fetch_add(1, Ordering::Relaxed);
        let name = format!("auto/asset_{serial}");
        let id = AssetId::new(&name);
        let name = self.config.track_names.then_some(name);

        let asset = self
            .registry
            .insert_with(|index| AssetHeader::new(asset_type, id, index, name, payload));

        tracing::trace!("Allocated {} {} at index {}", asset_type, id, asset.index());
        self.events.push(AssetEvent::Allocated {
            id,
            asset_type,
            index: asset.index(),
        });
        asset
    }

    /// Look up a live asset. Does not add a reference.
    ///
    /// Assets waiting in the deferred queue are still found until the next
    /// pump destroys them.
    pub fn find(&self, id: impl Into<AssetId>, asset_type: AssetType) -> Option<AssetRef> {
        self.registry.find(id.into(), asset_type)
    }

    /// Give `asset` a caller-chosen id, by name or by raw hash.
    ///
    /// Fails with [`AssetError::DuplicateId`] if another live asset of the
    /// same type already holds it; the asset keeps its old id then.
    pub fn set_id<'a>(
        &self,
        asset: &AssetHeader,
        key: impl Into<AssetKey<'a>>,
    ) -> AssetResult<()> {
        let key = key.into();
        let id = key.id();

        let old_id = match self.registry.assign_id(asset, id) {
            Ok(old_id) => old_id,
            Err(holder) => {
                tracing::error!(
                    "Cannot set {} id to {}: already held by the asset at index {}",
                    asset.asset_type(),
                    id,
                    holder.index()
                );
                return Err(AssetError::DuplicateId {
                    asset_type: asset.asset_type(),
                    id,
                });
            }
        };

        if self.config.track_names {
            asset.set_name(key.name().map(str::to_string));
        }

        if old_id != id {
            self.events.push(AssetEvent::Renamed {
                old_id,
                id,
                asset_type: asset.asset_type(),
            });
        }
        Ok(())
    }

    /// First of `root`, `root1`, `root2`, ... not used by a live asset of
    /// `asset_type`. See [`AssetRegistry::unique_name`] for the concurrency
    /// caveat.
    pub fn unique_name(&self, asset_type: AssetType, root: &str) -> String {
        self.registry.unique_name(asset_type, root)
    }

    /// Drop an asset from the registry without running its destroy hook.
    pub fn remove(&self, asset: &AssetHeader) -> bool {
        self.registry.remove(asset)
    }

    /// Tear down an asset whose count already reached zero.
    ///
    /// Off the owner thread the asset is queued for the next pump instead.
    pub fn destroy(&self, asset: &AssetRef) -> AssetResult<()> {
        let refs = asset.refs();
        if refs != 0 {
            tracing::error!(
                "Destroying {} {} that still has {} reference(s)",
                asset.asset_type(),
                asset.id(),
                refs
            );
            return Err(AssetError::StillReferenced {
                asset_type: asset.asset_type(),
                id: asset.id(),
                refs,
            });
        }

        if asset.is_destroyed() {
            return Err(AssetError::AlreadyDestroyed {
                asset_type: asset.asset_type(),
                id: asset.id(),
            });
        }

        if self.is_owner_thread() {
            self.destroy_now(asset);
        } else {
            self.defer(asset);
        }
        Ok(())
    }

    /// Run the destroy hook and unregister. Returns `false` if another call
    /// got there first.
    fn destroy_now(&self, asset: &AssetHeader) -> bool {
        if !asset.mark_destroyed() {
            return false;
        }

        let asset_type = asset.asset_type();
        let id = asset.id();

        match (self.lifecycles.get(asset_type), asset.take_payload()) {
            (Some(lifecycle), Some(payload)) => lifecycle.destroy_erased(self, asset, payload),
            (None, _) => tracing::error!(
                "No {} lifecycle to destroy {}; payload dropped without its hook",
                asset_type,
                id
            ),
            (Some(_), None) => {}
        }

        asset.take_name();
        self.registry.remove(asset);
        self.events.push(AssetEvent::Destroyed { id, asset_type });
        tracing::trace!("Destroyed {} {}", asset_type, id);
        true
    }

    fn defer(&self, asset: &AssetRef) {
        tracing::trace!(
            "Deferring destruction of {} {}",
            asset.asset_type(),
            asset.id()
        );
        self.deferred.push(asset.clone());
    }

    // ---- reference counting ----

    pub fn addref(&self, asset: &AssetHeader) {
        let previous = asset.increment();
        if previous <= 0 || asset.is_destroyed() {
            tracing::error!(
                "Added a reference to {} {} after its count reached zero",
                asset.asset_type(),
                asset.id()
            );
        }
    }

    /// Drop one reference. On the owner thread the last release destroys the
    /// asset inline; anywhere else it is deferred to the next pump.
    ///
    /// # Panics
    ///
    /// If more references are released than were held.
    pub fn releaseref(&self, asset: &AssetRef) {
        if !self.release(asset) {
            return;
        }
        if self.is_owner_thread() {
            self.destroy_now(asset);
        } else {
            self.defer(asset);
        }
    }

    /// Drop one reference, never destroying inline.
    ///
    /// # Panics
    ///
    /// If more references are released than were held.
    pub fn releaseref_threadsafe(&self, asset: &AssetRef) {
        if self.release(asset) {
            self.defer(asset);
        }
    }

    /// Returns `true` when this call released the last reference.
    fn release(&self, asset: &AssetHeader) -> bool {
        let refs = asset.decrement();
        if refs < 0 {
            tracing::error!(
                "Released too many references to {} {} (count is now {})",
                asset.asset_type(),
                asset.id(),
                refs
            );
            panic!(
                "released too many references to {} {}",
                asset.asset_type(),
                asset.id()
            );
        }
        refs == 0
    }

    /// Point `slot` at `asset`, moving one reference along with it.
    pub fn safeswap_ref(&self, slot: &mut AssetRef, asset: &AssetRef) {
        // Acquire before release: when `slot` already holds `asset` the count
        // must not touch zero in between.
        self.addref(asset);
        self.releaseref(slot);
        *slot = asset.clone();
    }

    // ---- jobs ----

    /// Queue a job. Blocking jobs are routed to the Gpu queue.
    ///
    /// Returns whether the job was accepted; after shutdown began jobs are
    /// silently dropped.
    ///
    /// A job that captures an `Arc<AssetServer>` keeps the server alive while
    /// it sits in a queue, so dropping the other handles does not run `Drop`.
    /// Call [`shutdown`](Self::shutdown) explicitly in that case: it drops
    /// every queued job and with them the captured handles.
    pub fn submit(&self, job: AssetJob) -> bool {
        self.workers.submit(job)
    }

    pub fn is_running(&self, category: JobCategory) -> bool {
        self.workers.is_running(category)
    }

    pub fn worker_state(&self, category: JobCategory) -> WorkerState {
        self.workers.state(category)
    }

    pub fn pending_jobs(&self, category: JobCategory) -> usize {
        self.workers.pending(category)
    }

    // ---- per-frame pump ----

    /// Destroy deferred assets, then run queued Gpu jobs. Call once per frame
    /// from the owner thread; calls from any other thread are ignored.
    ///
    /// Jobs must not call `update` themselves.
    pub fn update(&self) -> PumpStats {
        profile_function!();

        if !self.is_owner_thread() {
            tracing::error!("AssetServer::update called off the owner thread; ignored");
            return PumpStats::default();
        }

        let mut stats = PumpStats::default();

        {
            profile_scope!("deferred_destroy");
            for asset in self.deferred.take() {
                if asset.refs() != 0 {
                    tracing::warn!(
                        "{} {} regained references while queued for destruction",
                        asset.asset_type(),
                        asset.id()
                    );
                    continue;
                }
                if self.destroy_now(&asset) {
                    stats.destroyed += 1;
                }
            }
        }

        {
            profile_scope!("gpu_jobs");
            stats.gpu_jobs = self.workers.run_gpu_jobs();
        }

        stats
    }

    /// Assets waiting for the next pump.
    pub fn pending_destroy(&self) -> usize {
        self.deferred.len()
    }

    /// Take every event recorded since the last call.
    ///
    /// Events accumulate until drained; call this once per frame, next to
    /// [`update`](Self::update), or the buffer keeps growing.
    pub fn drain_events(&self) -> Vec<AssetEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ---- enumeration ----

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn count_of(&self, asset_type: AssetType) -> usize {
        self.registry.count_of(asset_type)
    }

    /// Snapshot of every live asset, in allocation order.
    pub fn assets(&self) -> Vec<AssetRef> {
        self.registry.snapshot()
    }

    /// Log and return every asset still registered.
    pub fn shutdown_check(&self) -> Vec<LeakedAsset> {
        self.registry.shutdown_check()
    }

    // ---- teardown ----

    /// Stop the workers, flush deferred destruction and run the leak check.
    ///
    /// Queued jobs that have not started are dropped. Leaks are returned, not
    /// treated as errors. Workers that do not stop within
    /// [`AssetsConfig::shutdown_timeout`] are detached and reported as
    /// [`AssetError::ShutdownTimeout`]. Calling it again is harmless.
    pub fn shutdown(&self) -> AssetResult<Vec<LeakedAsset>> {
        profile_function!();
        self.shut_down.store(true, Ordering::Release);
        tracing::debug!("Shutting down asset server");

        let workers = self.workers.shutdown(self.config.shutdown_timeout);

        if self.is_owner_thread() {
            for asset in self.deferred.take() {
                if asset.refs() == 0 {
                    self.destroy_now(&asset);
                }
            }
        } else if self.deferred.len() > 0 {
            tracing::warn!(
                "{} deferred asset(s) left undestroyed: shutdown ran off the owner thread",
                self.deferred.len()
            );
        }

        let leaks = self.registry.shutdown_check();
        workers?;
        Ok(leaks)
    }
}

impl Drop for AssetServer {
    fn drop(&mut self) {
        if *self.shut_down.get_mut() {
            return;
        }
        if let Err(err) = self.shutdown() {
            tracing::error!("Asset server shutdown failed: {}", err);
        }
    }
}

/// Builder for [`AssetServer`].
#[derive(Default)]
pub struct AssetServerBuilder {
    config: AssetsConfig,
    lifecycles: Vec<Arc<dyn ErasedAssetLifecycle>>,
}

impl AssetServerBuilder {
    pub fn with_config(mut self, config: AssetsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lifecycle<L: AssetLifecycle>(mut self, lifecycle: L) -> Self {
        self.lifecycles.push(Arc::new(lifecycle));
        self
    }

    /// Start the server on the calling thread.
    pub fn build(self) -> AssetResult<AssetServer> {
        let server = AssetServer::init(self.config)?;
        for lifecycle in self.lifecycles {
            server.lifecycles.register(lifecycle);
        }
        Ok(server)
    }
}

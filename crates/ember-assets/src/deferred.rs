//! Staging list for assets whose last reference was released off the owner
//! thread.

use parking_lot::Mutex;

use crate::header::AssetRef;

/// Assets waiting for the next pump to destroy them.
///
/// The lock is only held to append or to swap the whole list out; destroy hooks
/// run with it released, so an asset released while the pump is destroying
/// lands in the next frame's batch.
#[derive(Default)]
pub(crate) struct DeferredQueue {
    pending: Mutex<Vec<AssetRef>>,
}

impl DeferredQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, asset: AssetRef) {
        self.pending.lock().push(asset);
    }

    /// Take everything queued so far.
    pub(crate) fn take(&self) -> Vec<AssetRef> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

//! Asset events for change detection.

use parking_lot::Mutex;

use crate::asset_type::AssetType;
use crate::id::AssetId;

/// Events emitted by the asset server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    /// A header was allocated and registered.
    Allocated {
        /// The synthetic id given at allocation.
        id: AssetId,
        /// The type of the asset.
        asset_type: AssetType,
        /// Registry position at allocation time.
        index: usize,
    },

    /// `set_id` gave an asset a new id.
    Renamed {
        old_id: AssetId,
        id: AssetId,
        asset_type: AssetType,
    },

    /// The destroy hook ran and the asset left the registry.
    Destroyed {
        /// The id the asset held when it was destroyed.
        id: AssetId,
        /// The type of the asset.
        asset_type: AssetType,
    },
}

impl AssetEvent {
    /// Get the type of the asset this event relates to.
    pub fn asset_type(&self) -> AssetType {
        match self {
            AssetEvent::Allocated { asset_type, .. } => *asset_type,
            AssetEvent::Renamed { asset_type, .. } => *asset_type,
            AssetEvent::Destroyed { asset_type, .. } => *asset_type,
        }
    }

    /// Get the id the asset holds after this event.
    pub fn id(&self) -> AssetId {
        match self {
            AssetEvent::Allocated { id, .. } => *id,
            AssetEvent::Renamed { id, .. } => *id,
            AssetEvent::Destroyed { id, .. } => *id,
        }
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, AssetEvent::Allocated { .. })
    }

    pub fn is_renamed(&self) -> bool {
        matches!(self, AssetEvent::Renamed { .. })
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, AssetEvent::Destroyed { .. })
    }
}

/// Events are pushed from any thread and drained by the owner thread.
#[derive(Default)]
pub(crate) struct AssetEventBuffer {
    events: Mutex<Vec<AssetEvent>>,
}

impl AssetEventBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, event: AssetEvent) {
        self.events.lock().push(event);
    }

    pub(crate) fn drain(&self) -> Vec<AssetEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = AssetEvent::Renamed {
            old_id: AssetId::new("auto/asset_0"),
            id: AssetId::new("brick"),
            asset_type: AssetType::Texture,
        };
        assert_eq!(event.asset_type(), AssetType::Texture);
        assert_eq!(event.id(), AssetId::new("brick"));
        assert!(event.is_renamed());
        assert!(!event.is_allocated());
        assert!(!event.is_destroyed());
    }

    #[test]
    fn test_buffer_drains_in_order() {
        let buffer = AssetEventBuffer::new();
        buffer.push(AssetEvent::Allocated {
            id: AssetId::new("a"),
            asset_type: AssetType::Mesh,
            index: 0,
        });
        buffer.push(AssetEvent::Destroyed {
            id: AssetId::new("a"),
            asset_type: AssetType::Mesh,
        });
        assert_eq!(buffer.len(), 2);

        let events = buffer.drain();
        assert!(events[0].is_allocated());
        assert!(events[1].is_destroyed());
        assert_eq!(buffer.len(), 0);
    }
}

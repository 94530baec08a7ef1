//! Error types for the asset system.
//!
//! Only recoverable conditions live here. Over-releasing an asset and allocating
//! a type with no registered lifecycle are invariant violations and panic
//! instead of returning an error.

use std::fmt;
use std::time::Duration;

use crate::asset_type::AssetType;
use crate::id::AssetId;
use crate::job::JobCategory;

/// Errors that can occur during asset operations.
#[derive(Debug)]
pub enum AssetError {
    /// Destruction was requested while references are still held.
    StillReferenced {
        asset_type: AssetType,
        id: AssetId,
        /// The reference count observed at the time of the request.
        refs: i32,
    },

    /// The asset has already been torn down.
    AlreadyDestroyed { asset_type: AssetType, id: AssetId },

    /// Another live asset of the same type already holds this id.
    DuplicateId { asset_type: AssetType, id: AssetId },

    /// Worker threads did not stop within the configured shutdown timeout.
    ShutdownTimeout {
        /// Categories whose worker was still running.
        categories: Vec<JobCategory>,
        waited: Duration,
    },

    /// The OS refused to spawn a worker thread.
    WorkerSpawn {
        category: JobCategory,
        source: std::io::Error,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::StillReferenced {
                asset_type,
                id,
                refs,
            } => {
                write!(
                    f,
                    "Cannot destroy {} {}: still has {} reference(s)",
                    asset_type, id, refs
                )
            }
            AssetError::AlreadyDestroyed { asset_type, id } => {
                write!(f, "{} {} was already destroyed", asset_type, id)
            }
            AssetError::DuplicateId { asset_type, id } => {
                write!(f, "Another {} already uses {}", asset_type, id)
            }
            AssetError::ShutdownTimeout { categories, waited } => {
                let names: Vec<_> = categories.iter().map(|c| c.name()).collect();
                write!(
                    f,
                    "Worker(s) [{}] did not stop within {:?}",
                    names.join(", "),
                    waited
                )
            }
            AssetError::WorkerSpawn { category, source } => {
                write!(f, "Failed to spawn {} worker thread: {}", category, source)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::WorkerSpawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_mentions_refs() {
        let err = AssetError::StillReferenced {
            asset_type: AssetType::Mesh,
            id: AssetId::from_raw(1),
            refs: 2,
        };
        let text = err.to_string();
        assert!(text.contains("mesh"));
        assert!(text.contains("2 reference"));
    }

    #[test]
    fn test_timeout_lists_categories() {
        let err = AssetError::ShutdownTimeout {
            categories: vec![JobCategory::Io, JobCategory::Cpu],
            waited: Duration::from_millis(10),
        };
        assert!(err.to_string().contains("io, cpu"));
    }

    #[test]
    fn test_spawn_error_has_source() {
        let err = AssetError::WorkerSpawn {
            category: JobCategory::Io,
            source: std::io::Error::other("no threads left"),
        };
        assert!(err.source().is_some());
    }
}

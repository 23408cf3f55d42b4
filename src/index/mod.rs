//! Index instances, their query cache and snapshots, and the registry.

pub mod cache;
pub mod instance;
pub mod registry;
pub mod snapshot;

pub use cache::QueryCache;
pub use instance::IndexInstance;
pub use registry::{IndexRegistry, IndexSummary, RegistryStatistics};
pub use snapshot::{IndexSnapshot, SnapshotItem};

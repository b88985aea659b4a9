//! Installed and configured server records.
//!
//! The reconciler only talks to [`RecordStore`]; where records live is the
//! store's business. [`FileRecordStore`] keeps them in a JSON file,
//! [`MemoryRecordStore`] keeps them in memory.

mod file;
mod memory;
mod store;
mod types;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use store::{RecordSet, RecordStore};
pub use types::{
    CatalogEntry, ConfiguredServer, InstalledServer, RecreationMarker, RecreationPhase,
    ServerMetadata, MCP_PORT_KEY,
};

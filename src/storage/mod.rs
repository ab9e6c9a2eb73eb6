pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::{LedgerEntry, StorageEngine};
pub use memory::InMemoryStorage;
pub use persistence::{SnapshotManager, StorageSnapshot};
pub use table::{Table, TableSchema};

//! Migration artifact storage and the ledger-guarded runner.

pub mod runner;
pub mod store;

pub use runner::Migrator;
pub use store::{ArtifactStore, FsArtifactStore};

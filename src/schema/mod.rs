//! Schema synchronization: change operations, the comparer, and migration artifacts.

pub mod artifact;
pub mod change;
pub mod comparer;

pub use artifact::{ArtifactId, ArtifactIdGenerator, MigrationArtifact};
pub use change::{ChangeOperation, ChangeSet, ColumnDef, ColumnOptions};
pub use comparer::SchemaComparer;

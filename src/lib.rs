// ============================================================================
// metaorm Library
// ============================================================================

//! Declares a blueprint, migrates storage to match it, and saves an entity.
//!
//! ```
//! use metaorm::{
//!     AttributeDescriptor, AttributeType, Blueprint, BlueprintRegistry, EntityRuntime,
//!     EntityType, InMemoryStorage, Migrator, OrmConfig,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let config = OrmConfig::new().migrations_dir(dir.path());
//!
//! let mut blueprints = BlueprintRegistry::new();
//! blueprints.register(
//!     Blueprint::builder("UserBlueprint")
//!         .attribute(AttributeDescriptor::new("name", AttributeType::String).required())
//!         .attribute(AttributeDescriptor::new("age", AttributeType::Integer).range(0, 150))
//!         .build()?,
//! )?;
//! blueprints.seal();
//! let blueprints = Arc::new(blueprints);
//!
//! let storage = Arc::new(InMemoryStorage::new());
//! let migrator = Migrator::new(blueprints.clone(), storage.clone(), config.clone());
//! migrator.generate_all()?;
//! assert_eq!(migrator.apply_pending()?.len(), 1);
//!
//! let users = EntityType::bound_to("User", &blueprints, "UserBlueprint")?.build()?;
//! let runtime = EntityRuntime::new(storage, config);
//! let mut ada = users.new_instance();
//! ada.set("name", "Ada")?;
//! ada.set("age", 200)?;
//! assert!(!runtime.save(&users, &mut ada)?.is_saved());
//!
//! ada.set("age", 36)?;
//! assert!(runtime.save(&users, &mut ada)?.is_saved());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod entity;
pub mod metadata;
pub mod migration;
pub mod schema;
pub mod storage;

// Re-export main types for convenience
pub use config::OrmConfig;
pub use core::{DataType, ErrorCategory, OrmError, Result, Row, Value};
pub use metadata::{AttributeDescriptor, AttributeType, Blueprint, BlueprintRegistry};
pub use schema::{ChangeOperation, ChangeSet, MigrationArtifact, SchemaComparer};
pub use migration::{ArtifactStore, FsArtifactStore, Migrator};
pub use storage::{InMemoryStorage, StorageEngine};

// Re-export the entity runtime
pub use entity::{
    ChangeEvent, ChangeNotifier, ComparisonOp, EntityInstance, EntityRegistry, EntityRuntime,
    EntityType, SaveOutcome, ValidationErrors,
};

//! Declared attribute metadata: descriptors, blueprints, and the blueprint registry.

pub mod attribute;
pub mod blueprint;
pub mod naming;
pub mod registry;

pub use attribute::{AttributeDescriptor, AttributeType, ValueRange};
pub use blueprint::{Blueprint, BlueprintBuilder, DEFAULT_PRIMARY_KEY};
pub use naming::{default_index_name, is_valid_identifier, new_record_id, table_name_for};
pub use registry::BlueprintRegistry;

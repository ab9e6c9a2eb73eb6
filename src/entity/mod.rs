//! Metadata-driven entity runtime: typed instances, the save lifecycle,
//! validation, thresholds and change notification.

pub mod entity_type;
pub mod instance;
pub mod lifecycle;
pub mod notify;
pub mod registry;
pub mod threshold;
pub mod validation;

pub use entity_type::{Callback, EntityType, EntityTypeBuilder};
pub use instance::{EntityInstance, PersistenceState};
pub use lifecycle::{EntityRuntime, SaveOutcome, SaveReport, SaveStage};
pub use notify::{ChangeEvent, ChangeNotifier, NoopNotifier, RecordingNotifier};
pub use registry::EntityRegistry;
pub use threshold::{ComparisonOp, Severity, Threshold, ThresholdSignal};
pub use validation::{ValidationErrors, Violation, ViolationRule, validate};

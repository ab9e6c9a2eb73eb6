use thiserror::Error;

/// Broad failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad declarations; fatal at declaration time.
    Configuration,
    /// Range/enum violations surfaced through a rejected save.
    Validation,
    /// A storage operation failed while applying a migration artifact.
    SchemaDrift,
    /// A concurrent runner already recorded the artifact.
    Concurrency,
    Storage,
    Io,
}

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Configuration error in '{owner}': {message}")]
    Configuration { owner: String, message: String },

    #[error("Attribute '{owner}.{attribute}' declares type '{type_name}' with no storage mapping")]
    UnmappedType {
        owner: String,
        attribute: String,
        type_name: String,
    },

    #[error("Blueprint '{0}' is not registered")]
    BlueprintNotFound(String),

    #[error("Registry '{0}' is sealed; declarations are closed")]
    RegistrySealed(&'static str),

    #[error("{entity} rejected: {details}")]
    Validation { entity: String, details: String },

    #[error("Migration {artifact} failed at `{operation}`: {source}")]
    SchemaDrift {
        artifact: String,
        operation: String,
        #[source]
        source: Box<OrmError>,
    },

    #[error("Migration {0} is already recorded in the ledger")]
    LedgerConflict(String),

    #[error("Migration artifact '{0}' not found")]
    ArtifactNotFound(String),

    #[error("Invalid entity state: {0}")]
    InvalidState(String),

    #[error("Hook '{hook}' failed for {entity}: {message}")]
    HookFailed {
        entity: String,
        hook: String,
        message: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' already exists in table '{1}'")]
    ColumnExists(String, String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Record '{1}' not found in table '{0}'")]
    RecordNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl OrmError {
    pub fn configuration(owner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            owner: owner.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. }
            | Self::UnmappedType { .. }
            | Self::BlueprintNotFound(_)
            | Self::RegistrySealed(_) => ErrorCategory::Configuration,
            Self::SchemaDrift { .. } => ErrorCategory::SchemaDrift,
            Self::LedgerConflict(_) => ErrorCategory::Concurrency,
            Self::IoError(_) | Self::Serialization(_) | Self::ArtifactNotFound(_) => ErrorCategory::Io,
            Self::Validation { .. } => ErrorCategory::Validation,
            _ => ErrorCategory::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrmError>;

impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            OrmError::BlueprintNotFound("UserBlueprint".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(OrmError::LedgerConflict("1".into()).category(), ErrorCategory::Concurrency);
        assert_eq!(
            OrmError::TableNotFound("users".into()).category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn test_drift_message_names_artifact_and_operation() {
        let err = OrmError::SchemaDrift {
            artifact: "202601010000000000".into(),
            operation: "ALTER TABLE users DROP COLUMN email".into(),
            source: Box::new(OrmError::ColumnNotFound("email".into(), "users".into())),
        };
        let text = err.to_string();
        assert!(text.contains("202601010000000000"));
        assert!(text.contains("DROP COLUMN email"));
        assert_eq!(err.category(), ErrorCategory::SchemaDrift);
    }
}

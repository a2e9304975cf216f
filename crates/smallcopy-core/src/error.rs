//! Error types for smallcopy-core

use thiserror::Error;

/// Errors raised by a [`crate::TargetSchema`] implementation.
#[derive(Error, Debug)]
pub enum TargetError {
    /// Could not open or keep the database connection
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// A statement against the target failed
    #[error("Database query failed: {0}")]
    Query(String),

    /// Beginning or committing the run transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// The schema definition script failed to apply
    #[error("Schema script failed: {0}")]
    Script(String),
}

/// Errors produced while assembling or running an import.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A unit names a predecessor that is not registered before it.
    #[error("unit {unit:?} must run after its dependency {missing:?}")]
    DependencyOrder { unit: String, missing: String },

    /// A unit name was registered twice.
    #[error("unit {unit:?} is already registered")]
    DuplicateUnit { unit: String },

    /// Two units claim to populate the same target table.
    #[error("table {table:?} is populated by both {owner:?} and {unit:?}")]
    DuplicateTableOwner {
        table: String,
        owner: String,
        unit: String,
    },

    /// A unit reads a target table that none of its predecessors populate.
    #[error("unit {unit:?} reads table {table:?}, which no unit it runs after populates")]
    UnsatisfiedRead { unit: String, table: String },

    /// Target schema tables with no owning unit.
    #[error("tables missing a unit: {tables:?}")]
    Coverage { tables: Vec<String> },

    /// Target schema sequences with no manifest entry.
    #[error("sequences missing an update: {sequences:?}")]
    SequenceCoverage { sequences: Vec<String> },

    /// The static sequence manifest is malformed.
    #[error("invalid sequence manifest: {0}")]
    InvalidManifest(String),

    /// Bad run configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A unit body failed; the run is aborted.
    #[error("unit {unit:?} failed")]
    UnitExecution {
        unit: String,
        #[source]
        source: Box<ImportError>,
    },

    /// Bubbled-up target database error.
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl ImportError {
    /// The innermost error, unwrapping any [`ImportError::UnitExecution`] layers.
    pub fn root_cause(&self) -> &ImportError {
        match self {
            ImportError::UnitExecution { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the unit that failed, if this error came out of the engine.
    pub fn failing_unit(&self) -> Option<&str> {
        match self {
            ImportError::UnitExecution { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ImportError {
    fn from(err: toml::de::Error) -> Self {
        ImportError::Config(err.to_string())
    }
}

/// Result type for smallcopy operations
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Result type for target database operations
pub type TargetResult<T> = std::result::Result<T, TargetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_order_names_unit_and_missing() {
        let err = ImportError::DependencyOrder {
            unit: "authbcrypt".to_string(),
            missing: "login".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("authbcrypt"));
        assert!(msg.contains("login"));
    }

    #[test]
    fn test_unit_execution_leaves_cause_to_source_chain() {
        use std::error::Error as _;

        let err = ImportError::UnitExecution {
            unit: "submission".to_string(),
            source: Box::new(TargetError::Query("duplicate key".to_string()).into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("submission"));
        assert!(!msg.contains("duplicate key"));
        assert!(err
            .source()
            .map(|cause| cause.to_string().contains("duplicate key"))
            .unwrap_or(false));
        assert_eq!(err.failing_unit(), Some("submission"));
    }

    #[test]
    fn test_root_cause_unwraps_nested_execution() {
        let err = ImportError::UnitExecution {
            unit: "check tables".to_string(),
            source: Box::new(ImportError::Coverage {
                tables: vec!["journal".to_string()],
            }),
        };
        assert!(matches!(err.root_cause(), ImportError::Coverage { tables } if tables == &["journal"]));
    }
}

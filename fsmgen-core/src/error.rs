//! Core error types.

use crate::entity::{EntityKind, SourceLocation};
use std::fmt;
use thiserror::Error;

/// Errors from machine construction and queries.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("duplicate identifier '{id}': {incoming} collides with existing {existing}")]
    DuplicateIdentifier {
        id: String,
        existing: EntityKind,
        incoming: EntityKind,
    },

    #[error("identifier '{id}' is a {found}, expected a {expected}")]
    KindMismatch {
        id: String,
        expected: EntityKind,
        found: EntityKind,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("autogenerated message contains unsafe characters: {message:?}")]
    UnsafeMessage { message: String },

    #[error("invalid machine document: {reason}")]
    InvalidDocument { reason: String },

    #[error("unknown generation target: {target}")]
    UnknownTarget { target: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MachineError {
    /// Returns a stable error code for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            MachineError::DuplicateIdentifier { .. } => "DUPLICATE_IDENTIFIER",
            MachineError::KindMismatch { .. } => "KIND_MISMATCH",
            MachineError::Validation(_) => "VALIDATION_FAILED",
            MachineError::UnsafeMessage { .. } => "UNSAFE_MESSAGE",
            MachineError::InvalidDocument { .. } => "INVALID_DOCUMENT",
            MachineError::UnknownTarget { .. } => "UNKNOWN_TARGET",
            MachineError::Json(_) => "MALFORMED_JSON",
            MachineError::Yaml(_) => "MALFORMED_YAML",
        }
    }
}

/// A single defect found on an arc during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    #[error("missing 'from' state")]
    MissingFrom,

    #[error("unknown 'from' state '{0}'")]
    UnknownFrom(String),

    #[error("missing 'to' state")]
    MissingTo,

    #[error("unknown 'to' state '{0}'")]
    UnknownTo(String),

    #[error("missing event id")]
    MissingEvent,

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("state '{from}' already has an arc for event '{event}' (guard {guard:?}), first declared as '{first}'")]
    DuplicateArc {
        from: String,
        event: String,
        guard: Option<String>,
        first: String,
    },
}

/// A defect tied to the arc and source location it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub arc: String,
    pub location: SourceLocation,
    pub defect: Defect,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: arc '{}': {}", self.location, self.arc, self.defect)
    }
}

/// Aggregate of every defect found in one validation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationError {
    /// Returns the rendered message of each diagnostic.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_string()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "machine failed validation with {} defect(s)", self.diagnostics.len())?;
        for diagnostic in &self.diagnostics {
            write!(f, "\n  {}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Non-fatal findings. Logged and collected, never returned as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftWarning {
    #[error("enum_id '{enum_id}' is shared by '{first}' and '{second}'")]
    DuplicateEnumId {
        enum_id: String,
        first: String,
        second: String,
    },

    #[error("no events match type specifiers {specifiers:?}")]
    EmptyEvents { specifiers: Vec<String> },

    #[error("no arcs for the selected events")]
    EmptyArcs,

    #[error("no states reachable from the selected arcs")]
    EmptyStates,

    #[error("arc '{arc}' references unknown state '{state}', skipped")]
    UnresolvedState { arc: String, state: String },

    #[error("event '{event}' has an invalid type pattern {pattern:?}, matching literally")]
    InvalidTypePattern { event: String, pattern: String },

    #[error("wildcard arc '{arc}' not expanded for state '{state}': slot already claimed by arc '{claimed_by}'")]
    WildcardShadowed {
        arc: String,
        state: String,
        claimed_by: String,
    },

    #[error("derived arc '{arc}' collides with existing {existing} id, skipped")]
    DerivedArcCollision { arc: String, existing: EntityKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MachineError::DuplicateIdentifier {
            id: "IDLE".to_string(),
            existing: EntityKind::State,
            incoming: EntityKind::Event,
        };
        assert_eq!(err.error_code(), "DUPLICATE_IDENTIFIER");
        assert!(err.to_string().contains("event collides with existing state"));

        let err = MachineError::KindMismatch {
            id: "GO".to_string(),
            expected: EntityKind::State,
            found: EntityKind::Event,
        };
        assert_eq!(err.error_code(), "KIND_MISMATCH");

        let err = MachineError::UnknownTarget {
            target: "cobol".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_TARGET");
        let err = MachineError::UnsafeMessage {
            message: "*/".to_string(),
        };
        assert_eq!(err.error_code(), "UNSAFE_MESSAGE");
        let err = MachineError::InvalidDocument {
            reason: "machine id is empty".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_DOCUMENT");
    }

    #[test]
    fn test_validation_error_lists_every_diagnostic() {
        let err = ValidationError {
            diagnostics: vec![
                Diagnostic {
                    arc: "a1".to_string(),
                    location: SourceLocation::new("door.xml", 12),
                    defect: Defect::UnknownTo("OPEN".to_string()),
                },
                Diagnostic {
                    arc: "a2".to_string(),
                    location: SourceLocation::new("door.xml", 14),
                    defect: Defect::MissingEvent,
                },
            ],
        };

        let rendered = err.to_string();
        assert!(rendered.contains("2 defect(s)"));
        assert!(rendered.contains("door.xml:12: arc 'a1': unknown 'to' state 'OPEN'"));
        assert!(rendered.contains("door.xml:14: arc 'a2': missing event id"));
        assert_eq!(err.messages().len(), 2);
    }
}
